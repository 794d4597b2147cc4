use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{ChatMessage, DeviceKind, Player, StateSnapshot};

/// Identifying details of the office a session joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeDetail {
    #[serde(rename = "i")]
    pub id: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "d")]
    pub description: String,
}

/// A single field change on a player record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "f", rename_all = "snake_case")]
pub enum PlayerField {
    Position {
        x: f32,
        y: f32,
        #[serde(rename = "a")]
        anim: String,
    },
    Name {
        #[serde(rename = "n")]
        name: String,
    },
    /// The flags only ever transition to true, so they carry no value.
    ReadyToConnect,
    VideoConnected,
}

/// One granular mutation of the office state, replicated to every client in
/// the order it was applied.
///
/// For any entity, its add delta is observed before any of its change or
/// remove deltas; the fixed device and meeting-room pools exist before any
/// session connects and are delivered through the welcome snapshot instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "d", rename_all = "snake_case")]
pub enum StateDelta {
    PlayerAdded {
        #[serde(rename = "i")]
        id: String,
        #[serde(rename = "pl")]
        player: Player,
    },
    PlayerUpdated {
        #[serde(rename = "i")]
        id: String,
        #[serde(rename = "fs")]
        fields: Vec<PlayerField>,
    },
    PlayerRemoved {
        #[serde(rename = "i")]
        id: String,
    },
    DeviceUserAdded {
        #[serde(rename = "k")]
        kind: DeviceKind,
        #[serde(rename = "i")]
        id: String,
        #[serde(rename = "u")]
        user: String,
    },
    DeviceUserRemoved {
        #[serde(rename = "k")]
        kind: DeviceKind,
        #[serde(rename = "i")]
        id: String,
        #[serde(rename = "u")]
        user: String,
    },
    AttendeeAdded {
        #[serde(rename = "m")]
        meeting_room: String,
        #[serde(rename = "u")]
        user: String,
    },
    AttendeeRemoved {
        #[serde(rename = "m")]
        meeting_room: String,
        #[serde(rename = "u")]
        user: String,
    },
    PresenterChanged {
        #[serde(rename = "m")]
        meeting_room: String,
        /// Empty string when the room went back to idle
        #[serde(rename = "p")]
        presenter: String,
        #[serde(rename = "act")]
        is_active: bool,
    },
    ChatMessageAppended {
        #[serde(rename = "msg")]
        message: ChatMessage,
    },
}

/// Reply to a successful join: the session's id, the office details and a
/// full snapshot of the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeReplyEvent {
    #[serde(rename = "sid")]
    pub session_id: String,
    #[serde(rename = "o")]
    pub office: OfficeDetail,
    #[serde(rename = "st")]
    pub snapshot: StateSnapshot,
}

/// Why a join attempt was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRejectedReason {
    InvalidPassword,
}

/// Reply to a failed join attempt. Fatal to that attempt only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRejectedReplyEvent {
    #[serde(rename = "re")]
    pub reason: JoinRejectedReason,
}

/// One replication tick: every delta applied since the previous tick, in
/// application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSyncBroadcastEvent {
    #[serde(rename = "ds")]
    pub deltas: Vec<StateDelta>,
}

/// A chat message broadcast to everyone except its author, for immediate
/// in-world display; the chat log itself replicates through a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageBroadcastEvent {
    #[serde(rename = "sid")]
    pub session_id: String,
    #[serde(rename = "c")]
    pub content: String,
}

/// Notice to the other users of a computer that someone stopped sharing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenShareStoppedEvent {
    #[serde(rename = "c")]
    pub computer: String,
    #[serde(rename = "sid")]
    pub session_id: String,
}

/// Notice that a presentation started in a meeting room.
///
/// The copy sent to the presenter carries the push-list of attendees to
/// call; the copies sent to the attendees carry no list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationStartedEvent {
    #[serde(rename = "m")]
    pub meeting_room: String,
    #[serde(rename = "p")]
    pub presenter: String,
    #[serde(rename = "at", default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

/// Notice that a meeting room's presentation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationStoppedEvent {
    #[serde(rename = "m")]
    pub meeting_room: String,
}

/// A relayed signaling message. The sender id is stamped by the server from
/// the sending connection, never taken from the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterSignalEvent {
    #[serde(rename = "m")]
    pub meeting_room: String,
    #[serde(rename = "s")]
    pub sender: String,
    #[serde(rename = "pl")]
    pub payload: Value,
}

/// Notice that a peer tore down its stream towards the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDisconnectedEvent {
    #[serde(rename = "s")]
    pub sender: String,
}

/// Events that can be sent to the client.
/// Events may concern other users and shared entities, the recipient is always a single session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Event {
    Welcome(WelcomeReplyEvent),
    JoinRejected(JoinRejectedReplyEvent),
    StateSync(StateSyncBroadcastEvent),
    ChatMessage(ChatMessageBroadcastEvent),
    ScreenShareStopped(ScreenShareStoppedEvent),
    PresentationStarted(PresentationStartedEvent),
    PresentationStopped(PresentationStoppedEvent),
    PresenterOffer(PresenterSignalEvent),
    PresenterAnswer(PresenterSignalEvent),
    PresenterIceCandidate(PresenterSignalEvent),
    StreamDisconnected(StreamDisconnectedEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // given an event enum, and an expect string, asserts that event is serialized / deserialized appropiately
    fn assert_event_serialization(event: &Event, expected: &str) {
        let serialized = serde_json::to_string(&event).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *event);
    }

    #[test]
    fn test_welcome_event() {
        let event = Event::Welcome(WelcomeReplyEvent {
            session_id: "session-1".to_string(),
            office: OfficeDetail {
                id: "office-1".to_string(),
                name: "Public Office".to_string(),
                description: "test".to_string(),
            },
            snapshot: StateSnapshot::default(),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"welcome","sid":"session-1","o":{"i":"office-1","n":"Public Office","d":"test"},"st":{"pl":{},"co":{},"wb":{},"mr":{},"ch":[]}}"#,
        );
    }

    #[test]
    fn test_join_rejected_event() {
        let event = Event::JoinRejected(JoinRejectedReplyEvent {
            reason: JoinRejectedReason::InvalidPassword,
        });

        assert_event_serialization(&event, r#"{"t":"join_rejected","re":"invalid_password"}"#);
    }

    #[test]
    fn test_state_sync_event() {
        let event = Event::StateSync(StateSyncBroadcastEvent {
            deltas: vec![
                StateDelta::PlayerAdded {
                    id: "session-1".to_string(),
                    player: Player::default(),
                },
                StateDelta::PlayerUpdated {
                    id: "session-1".to_string(),
                    fields: vec![
                        PlayerField::Position {
                            x: 1.0,
                            y: 2.0,
                            anim: "idle".to_string(),
                        },
                        PlayerField::Name {
                            name: "ada".to_string(),
                        },
                    ],
                },
            ],
        });

        assert_event_serialization(
            &event,
            concat!(
                r#"{"t":"state_sync","ds":["#,
                r#"{"d":"player_added","i":"session-1","pl":{"n":"","x":0.0,"y":0.0,"a":"","rc":false,"vc":false}},"#,
                r#"{"d":"player_updated","i":"session-1","fs":[{"f":"position","x":1.0,"y":2.0,"a":"idle"},{"f":"name","n":"ada"}]}"#,
                r#"]}"#
            ),
        );
    }

    #[test]
    fn test_flag_field_deltas() {
        let event = Event::StateSync(StateSyncBroadcastEvent {
            deltas: vec![StateDelta::PlayerUpdated {
                id: "session-1".to_string(),
                fields: vec![PlayerField::ReadyToConnect, PlayerField::VideoConnected],
            }],
        });

        assert_event_serialization(
            &event,
            r#"{"t":"state_sync","ds":[{"d":"player_updated","i":"session-1","fs":[{"f":"ready_to_connect"},{"f":"video_connected"}]}]}"#,
        );
    }

    #[test]
    fn test_device_and_meeting_deltas() {
        let event = Event::StateSync(StateSyncBroadcastEvent {
            deltas: vec![
                StateDelta::DeviceUserAdded {
                    kind: DeviceKind::Computer,
                    id: "0".to_string(),
                    user: "session-1".to_string(),
                },
                StateDelta::AttendeeAdded {
                    meeting_room: "0".to_string(),
                    user: "session-1".to_string(),
                },
                StateDelta::PresenterChanged {
                    meeting_room: "0".to_string(),
                    presenter: "session-1".to_string(),
                    is_active: true,
                },
            ],
        });

        assert_event_serialization(
            &event,
            concat!(
                r#"{"t":"state_sync","ds":["#,
                r#"{"d":"device_user_added","k":"computer","i":"0","u":"session-1"},"#,
                r#"{"d":"attendee_added","m":"0","u":"session-1"},"#,
                r#"{"d":"presenter_changed","m":"0","p":"session-1","act":true}"#,
                r#"]}"#
            ),
        );
    }

    #[test]
    fn test_chat_message_events() {
        let event = Event::StateSync(StateSyncBroadcastEvent {
            deltas: vec![StateDelta::ChatMessageAppended {
                message: ChatMessage {
                    author: "ada".to_string(),
                    content: "hello".to_string(),
                    created_at: 1700000000000,
                },
            }],
        });

        assert_event_serialization(
            &event,
            r#"{"t":"state_sync","ds":[{"d":"chat_message_appended","msg":{"au":"ada","c":"hello","ts":1700000000000}}]}"#,
        );

        let event = Event::ChatMessage(ChatMessageBroadcastEvent {
            session_id: "session-1".to_string(),
            content: "hello".to_string(),
        });

        assert_event_serialization(&event, r#"{"t":"chat_message","sid":"session-1","c":"hello"}"#);
    }

    #[test]
    fn test_presentation_events() {
        let event = Event::PresentationStarted(PresentationStartedEvent {
            meeting_room: "0".to_string(),
            presenter: "session-a".to_string(),
            attendees: Some(vec!["session-b".to_string()]),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"presentation_started","m":"0","p":"session-a","at":["session-b"]}"#,
        );

        let event = Event::PresentationStarted(PresentationStartedEvent {
            meeting_room: "0".to_string(),
            presenter: "session-a".to_string(),
            attendees: None,
        });

        assert_event_serialization(&event, r#"{"t":"presentation_started","m":"0","p":"session-a"}"#);

        let event = Event::PresentationStopped(PresentationStoppedEvent {
            meeting_room: "0".to_string(),
        });

        assert_event_serialization(&event, r#"{"t":"presentation_stopped","m":"0"}"#);
    }

    #[test]
    fn test_signal_events() {
        let event = Event::PresenterOffer(PresenterSignalEvent {
            meeting_room: "0".to_string(),
            sender: "session-a".to_string(),
            payload: json!({"sdp": "v=0"}),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"presenter_offer","m":"0","s":"session-a","pl":{"sdp":"v=0"}}"#,
        );

        let event = Event::StreamDisconnected(StreamDisconnectedEvent {
            sender: "session-a".to_string(),
        });

        assert_event_serialization(&event, r#"{"t":"stream_disconnected","s":"session-a"}"#);
    }

    #[test]
    fn test_screen_share_stopped_event() {
        let event = Event::ScreenShareStopped(ScreenShareStoppedEvent {
            computer: "3".to_string(),
            session_id: "session-a".to_string(),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"screen_share_stopped","c":"3","sid":"session-a"}"#,
        );
    }
}
