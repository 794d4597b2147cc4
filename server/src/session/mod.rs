use comms::command::UserCommand;
use comms::event::{Event, JoinRejectedReplyEvent};
use comms::transport;
use nanoid::nanoid;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::office::{OfficeHandle, OUTBOUND_EVENT_CAPACITY};

/// Given a tcp stream and an office handle, handles the user session
/// until the user quits, the tcp stream is closed for some reason, or the server shuts down.
///
/// Whatever the exit path, the office is told about the departure so the
/// session's footprint is scrubbed in a single dispatcher turn.
pub async fn handle_session(
    office: OfficeHandle,
    quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (commands, event_writer) = transport::server::split_tcp_stream(stream);

    let result = run_session(&office, &session_id, commands, event_writer, quit_rx).await;

    // Departure cleanup is idempotent, so this also covers sessions that
    // were rejected or never finished joining
    let _ = office.disconnect(&session_id).await;

    result
}

async fn run_session(
    office: &OfficeHandle,
    session_id: &str,
    mut commands: transport::server::CommandStream,
    mut event_writer: transport::server::EventWriter,
    mut quit_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    // The first intact frame on a fresh connection must be a join; it
    // carries the office password when one is required
    let password = loop {
        match commands.next().await {
            Some(Ok(UserCommand::Join(cmd))) => break cmd.password,
            Some(Ok(_)) => {
                debug!(session = %session_id, "closing connection that sent commands before joining");
                return Ok(());
            }
            Some(Err(err)) => {
                warn!(session = %session_id, "dropping malformed frame: {:#}", err);
            }
            None => return Ok(()),
        }
    };

    let (outbound_tx, mut outbound) = mpsc::channel(OUTBOUND_EVENT_CAPACITY);

    if let Err(reason) = office.connect(session_id, password, outbound_tx).await? {
        event_writer
            .write(&Event::JoinRejected(JoinRejectedReplyEvent {
                reason: reason.into(),
            }))
            .await?;

        return Ok(());
    }

    loop {
        tokio::select! {
            maybe_command = commands.next() => match maybe_command {
                // The user closed the tcp stream or asked to quit; the
                // departure cleanup happens in handle_session either way
                None | Some(Ok(UserCommand::Quit(_))) => break,
                Some(Ok(command)) => office.command(session_id, command).await?,
                // A malformed frame never takes the session down
                Some(Err(err)) => {
                    warn!(session = %session_id, "dropping malformed frame: {:#}", err);
                }
            },
            maybe_event = outbound.recv() => match maybe_event {
                Some(event) => event_writer.write(&event).await?,
                // The office dropped our outbound channel, nothing more to forward
                None => break,
            },
            // If the server is shutting down we just close the tcp stream;
            // there is no one left to notify about the departure
            Ok(_) = quit_rx.recv() => {
                debug!(session = %session_id, "closing session for server shutdown");
                drop(event_writer);
                break;
            }
        }
    }

    Ok(())
}
