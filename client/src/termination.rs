#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;

/// Why the client is shutting down.
#[derive(Debug, Clone)]
pub enum Interrupted {
    OsSigInt,
    UserInt,
    /// The server closed the connection or refused the join
    ServerClosed,
}

/// Handle for requesting shutdown from anywhere in the client.
#[derive(Debug, Clone)]
pub struct Terminator {
    interrupt_tx: broadcast::Sender<Interrupted>,
}

impl Terminator {
    pub fn new(interrupt_tx: broadcast::Sender<Interrupted>) -> Self {
        Self { interrupt_tx }
    }

    pub fn terminate(&mut self, interrupted: Interrupted) -> anyhow::Result<()> {
        self.interrupt_tx.send(interrupted)?;

        Ok(())
    }
}

#[cfg(unix)]
async fn watch_interrupt_signal(mut terminator: Terminator) {
    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to create interrupt signal stream");

    interrupt.recv().await;

    terminator
        .terminate(Interrupted::OsSigInt)
        .expect("failed to send interrupt signal");
}

/// Create the interrupt channel shared by the binary and the store loop,
/// wired to the process interrupt signal on unix.
pub fn create_termination() -> (Terminator, broadcast::Receiver<Interrupted>) {
    let (tx, rx) = broadcast::channel(1);
    let terminator = Terminator::new(tx);

    #[cfg(unix)]
    tokio::spawn(watch_interrupt_signal(terminator.clone()));

    (terminator, rx)
}
