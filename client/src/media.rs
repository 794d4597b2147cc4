use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

/// Opaque handle to a captured media stream.
///
/// The media itself lives entirely in the layer implementing
/// [MediaCapture]; this core only passes the handle around to say which
/// stream a call should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle(u64);

impl StreamHandle {
    pub fn new(id: u64) -> Self {
        StreamHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Connection-setup metadata travelling through the signaling relay. The
/// payload is opaque at every hop.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerSignal {
    Offer(Value),
    Answer(Value),
    IceCandidate(Value),
}

/// A signal the peer layer wants relayed to one specific peer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingSignal {
    pub target: String,
    pub signal: PeerSignal,
}

/// An inbound peer link that became ready, with the remote stream attached.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingCall {
    pub from: String,
    pub stream: StreamHandle,
}

/// The user-driven media capture grant.
///
/// Acquiring may suspend until the user decides; dropping the future is the
/// cancellation. Completion is the single opaque stream-ready event this
/// core consumes.
#[async_trait]
pub trait MediaCapture: Send {
    async fn acquire(&mut self) -> anyhow::Result<StreamHandle>;
    async fn release(&mut self, stream: StreamHandle);
}

/// The peer-connection capability.
///
/// Implementations own all connection plumbing. Signals they want relayed
/// surface on the outgoing channel; established inbound links surface on
/// the incoming channel. Both channels can be taken exactly once, by the
/// store loop that forwards between them and the server.
#[async_trait]
pub trait PeerConnector: Send {
    /// Start calling a peer, attaching a local stream.
    async fn call(&mut self, target: &str, stream: &StreamHandle) -> anyhow::Result<()>;
    /// Hand a relayed signal from `sender` to the underlying connection.
    async fn deliver(&mut self, sender: &str, signal: PeerSignal);
    /// Tear down the link towards one peer; unknown peers are a no-op.
    async fn close(&mut self, target: &str);
    /// Tear down every link.
    async fn close_all(&mut self);
    fn take_outgoing(&mut self) -> Option<mpsc::Receiver<OutgoingSignal>>;
    fn take_incoming(&mut self) -> Option<mpsc::Receiver<IncomingCall>>;
}

/// Capture capability for headless clients that can never share media.
#[derive(Debug, Default)]
pub struct NullCapture;

#[async_trait]
impl MediaCapture for NullCapture {
    async fn acquire(&mut self) -> anyhow::Result<StreamHandle> {
        Err(anyhow::anyhow!("media capture is not available"))
    }

    async fn release(&mut self, _stream: StreamHandle) {}
}

/// Peer capability that never places or accepts calls. Its channels stay
/// open but silent, so a headless client can still run the full store loop.
#[derive(Debug)]
pub struct NullPeerConnector {
    outgoing_rx: Option<mpsc::Receiver<OutgoingSignal>>,
    incoming_rx: Option<mpsc::Receiver<IncomingCall>>,
    _outgoing_tx: mpsc::Sender<OutgoingSignal>,
    _incoming_tx: mpsc::Sender<IncomingCall>,
}

impl NullPeerConnector {
    pub fn new() -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let (incoming_tx, incoming_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);

        NullPeerConnector {
            outgoing_rx: Some(outgoing_rx),
            incoming_rx: Some(incoming_rx),
            _outgoing_tx: outgoing_tx,
            _incoming_tx: incoming_tx,
        }
    }
}

impl Default for NullPeerConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerConnector for NullPeerConnector {
    async fn call(&mut self, _target: &str, _stream: &StreamHandle) -> anyhow::Result<()> {
        Ok(())
    }

    async fn deliver(&mut self, _sender: &str, _signal: PeerSignal) {}

    async fn close(&mut self, _target: &str) {}

    async fn close_all(&mut self) {}

    fn take_outgoing(&mut self) -> Option<mpsc::Receiver<OutgoingSignal>> {
        self.outgoing_rx.take()
    }

    fn take_incoming(&mut self) -> Option<mpsc::Receiver<IncomingCall>> {
        self.incoming_rx.take()
    }
}
