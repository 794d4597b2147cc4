use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A player as replicated to every client.
///
/// Players are created with an empty name; the name is set once by a rename
/// command and a non-empty name is what marks the player as fully joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Display name, empty until the player picks one
    #[serde(rename = "n")]
    pub name: String,
    /// World position
    pub x: f32,
    pub y: f32,
    /// Current animation tag
    #[serde(rename = "a")]
    pub anim: String,
    /// The player finished local setup and accepts proximity calls
    #[serde(rename = "rc")]
    pub ready_to_connect: bool,
    /// The player has an active video connection
    #[serde(rename = "vc")]
    pub video_connected: bool,
}

impl Default for Player {
    fn default() -> Self {
        Player {
            name: String::new(),
            x: 0.0,
            y: 0.0,
            anim: String::new(),
            ready_to_connect: false,
            video_connected: false,
        }
    }
}

/// Which fixed device pool an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Computer,
    Whiteboard,
}

/// A shared device (computer or whiteboard) and the sessions connected to it.
///
/// Membership is a set, not an ordered list; a session id may only appear
/// here while that session is connected to the office.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "u")]
    pub connected_users: BTreeSet<String>,
}

/// A meeting room record.
///
/// `presenter_id` uses the empty string as the "no presenter" sentinel and
/// `is_active` must hold exactly when it is non-empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeetingRoom {
    #[serde(rename = "at")]
    pub attendees: BTreeSet<String>,
    #[serde(rename = "p")]
    pub presenter_id: String,
    #[serde(rename = "act")]
    pub is_active: bool,
}

impl MeetingRoom {
    /// The current presenter, if the room is in the presenting state.
    pub fn presenter(&self) -> Option<&str> {
        if self.presenter_id.is_empty() {
            None
        } else {
            Some(&self.presenter_id)
        }
    }
}

/// One entry of the append-only chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the author at the time of posting
    #[serde(rename = "au")]
    pub author: String,
    #[serde(rename = "c")]
    pub content: String,
    /// Milliseconds since the unix epoch
    #[serde(rename = "ts")]
    pub created_at: i64,
}

/// Full-state snapshot sent to a session right after it joins, so late
/// joiners see every player, device membership and the whole chat history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(rename = "pl")]
    pub players: BTreeMap<String, Player>,
    #[serde(rename = "co")]
    pub computers: BTreeMap<String, Device>,
    #[serde(rename = "wb")]
    pub whiteboards: BTreeMap<String, Device>,
    #[serde(rename = "mr")]
    pub meeting_rooms: BTreeMap<String, MeetingRoom>,
    #[serde(rename = "ch")]
    pub chat_messages: Vec<ChatMessage>,
}
