use comms::command::{
    DisconnectStreamCommand, PresenterAnswerCommand, PresenterIceCandidateCommand,
    PresenterOfferCommand,
};
use comms::event::{Event, PresenterSignalEvent, StreamDisconnectedEvent};
use tracing::debug;

use super::ConnectionMap;

/// Forward an event to the live connection registered for `target`.
///
/// Delivery is at-most-once and best-effort: an unknown target or a
/// backlogged connection drops the event, and nothing is surfaced to the
/// sender. Returns whether the event was handed to a connection.
pub(crate) fn deliver(connections: &ConnectionMap, target: &str, event: Event) -> bool {
    match connections.get(target) {
        Some(tx) => match tx.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                debug!(to = %target, "dropping event for backlogged connection");
                false
            }
        },
        None => {
            debug!(to = %target, "dropping event for unknown target");
            false
        }
    }
}

/// Relay a connection offer. The sender id delivered to the target is the
/// sending connection's session id; nothing in the payload is trusted or
/// even inspected.
pub(crate) fn relay_offer(connections: &ConnectionMap, sender: &str, cmd: PresenterOfferCommand) {
    deliver(
        connections,
        &cmd.target,
        Event::PresenterOffer(PresenterSignalEvent {
            meeting_room: cmd.meeting_room,
            sender: sender.to_string(),
            payload: cmd.payload,
        }),
    );
}

/// Relay a connection answer back towards the presenter.
pub(crate) fn relay_answer(connections: &ConnectionMap, sender: &str, cmd: PresenterAnswerCommand) {
    deliver(
        connections,
        &cmd.target,
        Event::PresenterAnswer(PresenterSignalEvent {
            meeting_room: cmd.meeting_room,
            sender: sender.to_string(),
            payload: cmd.payload,
        }),
    );
}

/// Relay an ICE candidate to the other end of a forming peer link.
pub(crate) fn relay_ice_candidate(
    connections: &ConnectionMap,
    sender: &str,
    cmd: PresenterIceCandidateCommand,
) {
    deliver(
        connections,
        &cmd.target,
        Event::PresenterIceCandidate(PresenterSignalEvent {
            meeting_room: cmd.meeting_room,
            sender: sender.to_string(),
            payload: cmd.payload,
        }),
    );
}

/// Relay a stream-teardown notice to one peer.
pub(crate) fn relay_stream_disconnect(
    connections: &ConnectionMap,
    sender: &str,
    cmd: DisconnectStreamCommand,
) {
    deliver(
        connections,
        &cmd.target,
        Event::StreamDisconnected(StreamDisconnectedEvent {
            sender: sender.to_string(),
        }),
    );
}
