use anyhow::Context;
use tokio::sync::mpsc;
use tracing::warn;

use crate::media::{
    IncomingCall, MediaCapture, OutgoingSignal, PeerConnector, PeerSignal, StreamHandle,
};

/// Drives the presenter and attendee sides of a meeting-room presentation
/// over the abstract media capabilities.
///
/// As presenter: acquire a stream ahead of claiming the seat, then call
/// every attendee on the push-list the server returns. As attendee: stay
/// passive, the presenter calls us. The controller decides who to call and
/// when to tear links down; it never touches media.
pub struct PresentationController {
    capture: Box<dyn MediaCapture>,
    peers: Box<dyn PeerConnector>,
    stream: Option<StreamHandle>,
    meeting_room: Option<String>,
}

impl PresentationController {
    pub fn new(capture: Box<dyn MediaCapture>, peers: Box<dyn PeerConnector>) -> Self {
        PresentationController {
            capture,
            peers,
            stream: None,
            meeting_room: None,
        }
    }

    pub fn take_outgoing(&mut self) -> Option<mpsc::Receiver<OutgoingSignal>> {
        self.peers.take_outgoing()
    }

    pub fn take_incoming(&mut self) -> Option<mpsc::Receiver<IncomingCall>> {
        self.peers.take_incoming()
    }

    pub fn is_presenting(&self) -> bool {
        self.stream.is_some()
    }

    /// Acquire the local stream ahead of asking the server for the seat.
    ///
    /// Suspends until the user grants or denies capture. Starting while a
    /// stream is already held changes nothing and returns None.
    pub async fn start(&mut self, meeting_room: &str) -> anyhow::Result<Option<StreamHandle>> {
        if self.stream.is_some() {
            return Ok(None);
        }

        let stream = self
            .capture
            .acquire()
            .await
            .context("media capture was not granted")?;

        self.stream = Some(stream.clone());
        self.meeting_room = Some(meeting_room.to_string());

        Ok(Some(stream))
    }

    /// React to a presentation-started notice. Only the presenter copy
    /// carries a push-list; call everyone on it. The attendee copy carries
    /// none and the presenter will call us, so there is nothing to do.
    pub async fn handle_started(&mut self, meeting_room: &str, attendees: Option<&[String]>) {
        let Some(attendees) = attendees else {
            return;
        };

        if self.meeting_room.as_deref() != Some(meeting_room) {
            return;
        }

        let Some(stream) = self.stream.clone() else {
            return;
        };

        for attendee in attendees {
            if let Err(err) = self.peers.call(attendee, &stream).await {
                warn!(attendee = %attendee, "failed to call attendee: {:#}", err);
            }
        }
    }

    /// React to a presentation-stopped notice for `meeting_room`. A notice
    /// for a room we are actively presenting elsewhere in is ignored.
    pub async fn handle_stopped(&mut self, meeting_room: &str) {
        let concerns_us = match self.meeting_room.as_deref() {
            Some(own) => own == meeting_room,
            None => true,
        };

        if concerns_us {
            self.stop().await;
        }
    }

    /// Tear down every peer link and release the local stream, if any.
    /// Stopping a presentation that is not running changes nothing.
    pub async fn stop(&mut self) {
        self.peers.close_all().await;

        if let Some(stream) = self.stream.take() {
            self.capture.release(stream).await;
        }

        self.meeting_room = None;
    }

    pub async fn deliver_signal(&mut self, sender: &str, signal: PeerSignal) {
        self.peers.deliver(sender, signal).await;
    }

    pub async fn peer_closed(&mut self, peer: &str) {
        self.peers.close(peer).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeMediaLog {
        calls: Vec<String>,
        released: Vec<u64>,
    }

    struct ScriptedCapture {
        next_id: u64,
        grant: bool,
        log: Arc<Mutex<FakeMediaLog>>,
    }

    #[async_trait]
    impl MediaCapture for ScriptedCapture {
        async fn acquire(&mut self) -> anyhow::Result<StreamHandle> {
            if !self.grant {
                return Err(anyhow::anyhow!("the user denied capture"));
            }

            self.next_id += 1;
            Ok(StreamHandle::new(self.next_id))
        }

        async fn release(&mut self, stream: StreamHandle) {
            self.log.lock().unwrap().released.push(stream.id());
        }
    }

    struct RecordingPeerConnector {
        log: Arc<Mutex<FakeMediaLog>>,
        closed_all: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl PeerConnector for RecordingPeerConnector {
        async fn call(&mut self, target: &str, _stream: &StreamHandle) -> anyhow::Result<()> {
            self.log.lock().unwrap().calls.push(target.to_string());
            Ok(())
        }

        async fn deliver(&mut self, _sender: &str, _signal: PeerSignal) {}

        async fn close(&mut self, _target: &str) {}

        async fn close_all(&mut self) {
            *self.closed_all.lock().unwrap() += 1;
        }

        fn take_outgoing(&mut self) -> Option<mpsc::Receiver<OutgoingSignal>> {
            None
        }

        fn take_incoming(&mut self) -> Option<mpsc::Receiver<IncomingCall>> {
            None
        }
    }

    fn controller(
        grant: bool,
    ) -> (PresentationController, Arc<Mutex<FakeMediaLog>>, Arc<Mutex<usize>>) {
        let log = Arc::new(Mutex::new(FakeMediaLog::default()));
        let closed_all = Arc::new(Mutex::new(0));
        let controller = PresentationController::new(
            Box::new(ScriptedCapture {
                next_id: 0,
                grant,
                log: log.clone(),
            }),
            Box::new(RecordingPeerConnector {
                log: log.clone(),
                closed_all: closed_all.clone(),
            }),
        );

        (controller, log, closed_all)
    }

    #[tokio::test]
    async fn test_presenter_calls_every_listed_attendee() {
        let (mut controller, log, _closed) = controller(true);

        let stream = controller.start("0").await.unwrap();
        assert!(stream.is_some());

        controller
            .handle_started(
                "0",
                Some(&["session-b".to_string(), "session-c".to_string()]),
            )
            .await;

        assert_eq!(log.lock().unwrap().calls, vec!["session-b", "session-c"]);
    }

    #[tokio::test]
    async fn test_attendee_copy_without_push_list_calls_no_one() {
        let (mut controller, log, _closed) = controller(true);

        controller.handle_started("0", None).await;

        assert!(log.lock().unwrap().calls.is_empty());
        assert!(!controller.is_presenting());
    }

    #[tokio::test]
    async fn test_denied_capture_surfaces_an_error() {
        let (mut controller, log, _closed) = controller(false);

        assert!(controller.start("0").await.is_err());
        assert!(!controller.is_presenting());
        assert!(log.lock().unwrap().calls.is_empty());
    }

    #[tokio::test]
    async fn test_stop_releases_the_stream_and_is_idempotent() {
        let (mut controller, log, closed_all) = controller(true);

        controller.start("0").await.unwrap();
        controller.stop().await;
        controller.stop().await;

        assert!(!controller.is_presenting());
        assert_eq!(log.lock().unwrap().released, vec![1]);
        assert_eq!(*closed_all.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stop_notice_for_another_room_is_ignored_while_presenting() {
        let (mut controller, log, _closed) = controller(true);

        controller.start("0").await.unwrap();
        controller.handle_stopped("1").await;
        assert!(controller.is_presenting());

        controller.handle_stopped("0").await;
        assert!(!controller.is_presenting());
        assert_eq!(log.lock().unwrap().released, vec![1]);
    }

    #[tokio::test]
    async fn test_starting_twice_keeps_the_first_stream() {
        let (mut controller, _log, _closed) = controller(true);

        let first = controller.start("0").await.unwrap();
        let second = controller.start("0").await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(controller.is_presenting());
    }
}
