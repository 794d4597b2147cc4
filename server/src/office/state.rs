use std::collections::{BTreeMap, BTreeSet};

use comms::event::{PlayerField, StateDelta};
use comms::state::{ChatMessage, Device, DeviceKind, MeetingRoom, Player, StateSnapshot};

use super::topic::Topic;

pub const COMPUTER_POOL_SIZE: usize = 5;
pub const WHITEBOARD_POOL_SIZE: usize = 3;
pub const MEETING_ROOM_POOL_SIZE: usize = 2;

/// One publish/subscribe topic per replicated collection. In-process
/// subscribers observe a mutation's delta immediately; remote observers get
/// the same delta on the next replication tick.
#[derive(Debug, Default)]
pub struct OfficeTopics {
    pub players: Topic<StateDelta>,
    pub computers: Topic<StateDelta>,
    pub whiteboards: Topic<StateDelta>,
    pub meeting_rooms: Topic<StateDelta>,
    pub chat: Topic<StateDelta>,
}

impl OfficeTopics {
    fn for_device(&self, kind: DeviceKind) -> &Topic<StateDelta> {
        match kind {
            DeviceKind::Computer => &self.computers,
            DeviceKind::Whiteboard => &self.whiteboards,
        }
    }
}

/// The canonical office state.
///
/// [OfficeState] exclusively owns every replicated collection; other
/// components read through its accessors and mutate through its methods,
/// which all run inside a single dispatcher turn. Every mutation appends a
/// granular delta to the journal drained by the replication tick.
#[derive(Debug)]
pub struct OfficeState {
    players: BTreeMap<String, Player>,
    computers: BTreeMap<String, Device>,
    whiteboards: BTreeMap<String, Device>,
    meeting_rooms: BTreeMap<String, MeetingRoom>,
    chat_messages: Vec<ChatMessage>,
    journal: Vec<StateDelta>,
    topics: OfficeTopics,
}

impl OfficeState {
    /// Create the state with its fixed device and meeting-room pools. The
    /// pools exist before any session can connect, so they replicate via
    /// the welcome snapshot rather than through add deltas.
    pub fn new() -> Self {
        let pool = |size: usize| -> BTreeMap<String, Device> {
            (0..size).map(|i| (i.to_string(), Device::default())).collect()
        };

        OfficeState {
            players: BTreeMap::new(),
            computers: pool(COMPUTER_POOL_SIZE),
            whiteboards: pool(WHITEBOARD_POOL_SIZE),
            meeting_rooms: (0..MEETING_ROOM_POOL_SIZE)
                .map(|i| (i.to_string(), MeetingRoom::default()))
                .collect(),
            chat_messages: Vec::new(),
            journal: Vec::new(),
            topics: OfficeTopics::default(),
        }
    }

    pub fn topics(&self) -> &OfficeTopics {
        &self.topics
    }

    pub fn player(&self, session_id: &str) -> Option<&Player> {
        self.players.get(session_id)
    }

    pub fn meeting_room(&self, id: &str) -> Option<&MeetingRoom> {
        self.meeting_rooms.get(id)
    }

    pub fn meeting_room_ids(&self) -> Vec<String> {
        self.meeting_rooms.keys().cloned().collect()
    }

    pub fn device_users(&self, kind: DeviceKind, id: &str) -> Option<&BTreeSet<String>> {
        self.devices(kind).get(id).map(|device| &device.connected_users)
    }

    pub fn device_ids(&self, kind: DeviceKind) -> Vec<String> {
        self.devices(kind).keys().cloned().collect()
    }

    /// Create the session's player with an empty name. The display name
    /// arrives later through a rename command.
    pub fn create_player(&mut self, session_id: &str) {
        if self.players.contains_key(session_id) {
            return;
        }

        let player = Player::default();
        self.players.insert(session_id.to_string(), player.clone());
        self.record_player(StateDelta::PlayerAdded {
            id: session_id.to_string(),
            player,
        });
    }

    pub fn remove_player(&mut self, session_id: &str) -> bool {
        if self.players.remove(session_id).is_none() {
            return false;
        }

        self.record_player(StateDelta::PlayerRemoved {
            id: session_id.to_string(),
        });

        true
    }

    /// Overwrite position and animation, last write wins.
    pub fn update_player_position(&mut self, session_id: &str, x: f32, y: f32, anim: &str) {
        let Some(player) = self.players.get_mut(session_id) else {
            return;
        };

        player.x = x;
        player.y = y;
        player.anim = anim.to_string();

        self.record_player(StateDelta::PlayerUpdated {
            id: session_id.to_string(),
            fields: vec![PlayerField::Position {
                x,
                y,
                anim: anim.to_string(),
            }],
        });
    }

    /// Set the display name. Re-setting the current name is observationally
    /// a no-op: no delta is journaled.
    pub fn set_player_name(&mut self, session_id: &str, name: &str) -> bool {
        let Some(player) = self.players.get_mut(session_id) else {
            return false;
        };

        if player.name == name {
            return false;
        }

        player.name = name.to_string();
        self.record_player(StateDelta::PlayerUpdated {
            id: session_id.to_string(),
            fields: vec![PlayerField::Name {
                name: name.to_string(),
            }],
        });

        true
    }

    pub fn mark_ready_to_connect(&mut self, session_id: &str) {
        let Some(player) = self.players.get_mut(session_id) else {
            return;
        };

        if player.ready_to_connect {
            return;
        }

        player.ready_to_connect = true;
        self.record_player(StateDelta::PlayerUpdated {
            id: session_id.to_string(),
            fields: vec![PlayerField::ReadyToConnect],
        });
    }

    pub fn mark_video_connected(&mut self, session_id: &str) {
        let Some(player) = self.players.get_mut(session_id) else {
            return;
        };

        if player.video_connected {
            return;
        }

        player.video_connected = true;
        self.record_player(StateDelta::PlayerUpdated {
            id: session_id.to_string(),
            fields: vec![PlayerField::VideoConnected],
        });
    }

    /// Add a session to a device's connected set. Returns false, without any
    /// state change, when the device does not exist or the session is
    /// already connected to it.
    pub fn add_device_user(&mut self, kind: DeviceKind, id: &str, user: &str) -> bool {
        let Some(device) = self.devices_mut(kind).get_mut(id) else {
            return false;
        };

        if !device.connected_users.insert(user.to_string()) {
            return false;
        }

        self.record_device(
            kind,
            StateDelta::DeviceUserAdded {
                kind,
                id: id.to_string(),
                user: user.to_string(),
            },
        );

        true
    }

    pub fn remove_device_user(&mut self, kind: DeviceKind, id: &str, user: &str) -> bool {
        let Some(device) = self.devices_mut(kind).get_mut(id) else {
            return false;
        };

        if !device.connected_users.remove(user) {
            return false;
        }

        self.record_device(
            kind,
            StateDelta::DeviceUserRemoved {
                kind,
                id: id.to_string(),
                user: user.to_string(),
            },
        );

        true
    }

    /// Add a session to a meeting room's attendee set, idempotently.
    pub fn add_attendee(&mut self, meeting_room: &str, user: &str) -> bool {
        let Some(room) = self.meeting_rooms.get_mut(meeting_room) else {
            return false;
        };

        if !room.attendees.insert(user.to_string()) {
            return false;
        }

        self.record_meeting(StateDelta::AttendeeAdded {
            meeting_room: meeting_room.to_string(),
            user: user.to_string(),
        });

        true
    }

    pub fn remove_attendee(&mut self, meeting_room: &str, user: &str) -> bool {
        let Some(room) = self.meeting_rooms.get_mut(meeting_room) else {
            return false;
        };

        if !room.attendees.remove(user) {
            return false;
        }

        self.record_meeting(StateDelta::AttendeeRemoved {
            meeting_room: meeting_room.to_string(),
            user: user.to_string(),
        });

        true
    }

    /// Move a meeting room into the presenting state. `presenter_id` and
    /// `is_active` always change together so the room record can never hold
    /// one without the other.
    pub fn set_presenter(&mut self, meeting_room: &str, presenter: &str) {
        let Some(room) = self.meeting_rooms.get_mut(meeting_room) else {
            return;
        };

        room.presenter_id = presenter.to_string();
        room.is_active = true;

        self.record_meeting(StateDelta::PresenterChanged {
            meeting_room: meeting_room.to_string(),
            presenter: presenter.to_string(),
            is_active: true,
        });
    }

    /// Move a meeting room back to idle, returning the former presenter.
    /// Clearing an idle room changes nothing and returns None.
    pub fn clear_presenter(&mut self, meeting_room: &str) -> Option<String> {
        let room = self.meeting_rooms.get_mut(meeting_room)?;

        if room.presenter_id.is_empty() {
            return None;
        }

        let former = std::mem::take(&mut room.presenter_id);
        room.is_active = false;

        self.record_meeting(StateDelta::PresenterChanged {
            meeting_room: meeting_room.to_string(),
            presenter: String::new(),
            is_active: false,
        });

        Some(former)
    }

    pub fn append_chat(&mut self, author: &str, content: &str, created_at: i64) -> ChatMessage {
        let message = ChatMessage {
            author: author.to_string(),
            content: content.to_string(),
            created_at,
        };

        self.chat_messages.push(message.clone());
        self.record_chat(StateDelta::ChatMessageAppended {
            message: message.clone(),
        });

        message
    }

    /// Take every delta accumulated since the last call, in the order the
    /// mutations were applied.
    pub fn drain_deltas(&mut self) -> Vec<StateDelta> {
        std::mem::take(&mut self.journal)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            players: self.players.clone(),
            computers: self.computers.clone(),
            whiteboards: self.whiteboards.clone(),
            meeting_rooms: self.meeting_rooms.clone(),
            chat_messages: self.chat_messages.clone(),
        }
    }

    fn devices(&self, kind: DeviceKind) -> &BTreeMap<String, Device> {
        match kind {
            DeviceKind::Computer => &self.computers,
            DeviceKind::Whiteboard => &self.whiteboards,
        }
    }

    fn devices_mut(&mut self, kind: DeviceKind) -> &mut BTreeMap<String, Device> {
        match kind {
            DeviceKind::Computer => &mut self.computers,
            DeviceKind::Whiteboard => &mut self.whiteboards,
        }
    }

    fn record_player(&mut self, delta: StateDelta) {
        self.topics.players.publish(delta.clone());
        self.journal.push(delta);
    }

    fn record_device(&mut self, kind: DeviceKind, delta: StateDelta) {
        self.topics.for_device(kind).publish(delta.clone());
        self.journal.push(delta);
    }

    fn record_meeting(&mut self, delta: StateDelta) {
        self.topics.meeting_rooms.publish(delta.clone());
        self.journal.push(delta);
    }

    fn record_chat(&mut self, delta: StateDelta) {
        self.topics.chat.publish(delta.clone());
        self.journal.push(delta);
    }
}
