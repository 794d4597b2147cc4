use comms::event::{Event, PresentationStartedEvent, PresentationStoppedEvent};

use super::signaling;
use super::state::OfficeState;
use super::ConnectionMap;

/// Add a session to a meeting room's attendee set.
///
/// Joining is idempotent. When the join actually adds the session and the
/// room is presenting, the joiner alone is told the current presenter id so
/// it can await the incoming call; the presenter is not re-notified.
pub(crate) fn join(
    state: &mut OfficeState,
    connections: &ConnectionMap,
    session_id: &str,
    meeting_room: &str,
) {
    if !state.add_attendee(meeting_room, session_id) {
        return;
    }

    let presenter = state
        .meeting_room(meeting_room)
        .and_then(|room| room.presenter())
        .map(String::from);

    if let Some(presenter) = presenter {
        signaling::deliver(
            connections,
            session_id,
            Event::PresentationStarted(PresentationStartedEvent {
                meeting_room: meeting_room.to_string(),
                presenter,
                attendees: None,
            }),
        );
    }
}

/// Remove a session from a meeting room. If the leaving session holds the
/// presenter seat, the room falls back to idle with the full stop fanout.
pub(crate) fn leave(
    state: &mut OfficeState,
    connections: &ConnectionMap,
    session_id: &str,
    meeting_room: &str,
) {
    state.remove_attendee(meeting_room, session_id);

    let was_presenting = state
        .meeting_room(meeting_room)
        .map(|room| room.presenter() == Some(session_id))
        .unwrap_or(false);

    if was_presenting {
        end_presentation(state, connections, meeting_room);
    }
}

/// Idle -> Presenting transition. The first request wins; a request while
/// the room is already presenting, or from a session not currently in the
/// room, leaves the state unchanged without surfacing anything.
///
/// The new presenter is handed the push-list of every other attendee so it
/// can call them right away; each of those attendees is told the presenter
/// id without a list.
pub(crate) fn start(
    state: &mut OfficeState,
    connections: &ConnectionMap,
    session_id: &str,
    meeting_room: &str,
) {
    let Some(room) = state.meeting_room(meeting_room) else {
        return;
    };

    if room.is_active || !room.attendees.contains(session_id) {
        return;
    }

    let push_list: Vec<String> = room
        .attendees
        .iter()
        .filter(|attendee| attendee.as_str() != session_id)
        .cloned()
        .collect();

    state.set_presenter(meeting_room, session_id);

    signaling::deliver(
        connections,
        session_id,
        Event::PresentationStarted(PresentationStartedEvent {
            meeting_room: meeting_room.to_string(),
            presenter: session_id.to_string(),
            attendees: Some(push_list.clone()),
        }),
    );

    for attendee in push_list {
        signaling::deliver(
            connections,
            &attendee,
            Event::PresentationStarted(PresentationStartedEvent {
                meeting_room: meeting_room.to_string(),
                presenter: session_id.to_string(),
                attendees: None,
            }),
        );
    }
}

/// Explicit stop. Only the current presenter can stop a presentation;
/// anyone else, and stopping an idle room, is an inert no-op.
pub(crate) fn stop(
    state: &mut OfficeState,
    connections: &ConnectionMap,
    session_id: &str,
    meeting_room: &str,
) {
    let is_presenter = state
        .meeting_room(meeting_room)
        .map(|room| room.presenter() == Some(session_id))
        .unwrap_or(false);

    if !is_presenter {
        return;
    }

    end_presentation(state, connections, meeting_room);
}

/// Presenting -> Idle transition shared by explicit stop, the presenter
/// leaving the room and the presenter disconnecting. Every attendee other
/// than the former presenter receives exactly one stop notice.
pub(crate) fn end_presentation(
    state: &mut OfficeState,
    connections: &ConnectionMap,
    meeting_room: &str,
) {
    let Some(former) = state.clear_presenter(meeting_room) else {
        return;
    };

    let attendees: Vec<String> = state
        .meeting_room(meeting_room)
        .map(|room| {
            room.attendees
                .iter()
                .filter(|attendee| **attendee != former)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    for attendee in attendees {
        signaling::deliver(
            connections,
            &attendee,
            Event::PresentationStopped(PresentationStoppedEvent {
                meeting_room: meeting_room.to_string(),
            }),
        );
    }
}
