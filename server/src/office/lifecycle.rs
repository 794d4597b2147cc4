use comms::state::DeviceKind;

use super::meeting;
use super::state::OfficeState;
use super::ConnectionMap;

/// Remove every trace of a departed session within one dispatcher turn: its
/// player, its device memberships, its meeting-room attendance and, when it
/// held a presenter seat, the seat itself with the full stop fanout.
///
/// Running the whole cleanup in a single turn means the deltas land in the
/// same replication batch, so no client can observe a session half-removed.
pub(crate) fn session_departed(
    state: &mut OfficeState,
    connections: &mut ConnectionMap,
    session_id: &str,
) {
    connections.remove(session_id);
    state.remove_player(session_id);

    for kind in [DeviceKind::Computer, DeviceKind::Whiteboard] {
        for id in state.device_ids(kind) {
            state.remove_device_user(kind, &id, session_id);
        }
    }

    for meeting_room in state.meeting_room_ids() {
        state.remove_attendee(&meeting_room, session_id);

        let was_presenting = state
            .meeting_room(&meeting_room)
            .map(|room| room.presenter() == Some(session_id))
            .unwrap_or(false);

        if was_presenting {
            meeting::end_presentation(state, connections, &meeting_room);
        }
    }
}
