use std::collections::BTreeMap;

use circular_queue::CircularQueue;
use comms::event::{Event, OfficeDetail, PlayerField, StateDelta};
use comms::state::{Device, DeviceKind, MeetingRoom, Player};

use crate::media::StreamHandle;

/// One line of the chat pane: a replicated message or a local notification.
#[derive(Debug, Clone)]
pub enum MessageBoxItem {
    Message { author: String, content: String },
    Notification(String),
}

const MAX_MESSAGES_TO_STORE: usize = 100;

/// Discrete domain notices published to the rendering layer, next to the
/// full state clones it also receives.
#[derive(Debug, Clone)]
pub enum Notice {
    JoinedOffice { session_id: String },
    /// A remote player finished picking a name, which is what makes them
    /// visible as joined
    PlayerJoined { session_id: String, name: String },
    PlayerLeft { session_id: String },
    PlayerUpdated { session_id: String },
    DeviceUserAdded { kind: DeviceKind, device: String, session_id: String },
    DeviceUserRemoved { kind: DeviceKind, device: String, session_id: String },
    AttendeeCountChanged { meeting_room: String, count: usize },
    ChatBubble { session_id: String, content: String },
    ScreenShareStopped { computer: String, session_id: String },
    PresentationStarted { meeting_room: String, presenter: String },
    PresentationStopped { meeting_room: String },
    ViewerOpened { meeting_room: String },
    PresenterStreamReady { from: String },
}

/// Client-side meeting-room viewer state driving the auto-open policy.
#[derive(Debug, Clone, Default)]
pub struct MeetingViewer {
    pub open: bool,
    /// The meeting room the viewer is bound to while open
    pub meeting_room: Option<String>,
    /// Last known presenter, fed by started/stopped notices
    pub presenter: Option<String>,
    pub presenting: bool,
    pub my_stream: Option<StreamHandle>,
    pub presenter_stream: Option<StreamHandle>,
    pub in_zone: bool,
    pub zone_meeting_room: Option<String>,
}

/// The local reactive mirror of the replicated office state.
///
/// Replication events replay into this mirror idempotently: a re-delivered
/// add overwrites, a re-delivered membership change is absorbed by the set.
/// The mirror is cloned out to the rendering layer after every change.
#[derive(Debug, Clone)]
pub struct State {
    pub session_id: String,
    pub office: Option<OfficeDetail>,
    pub players: BTreeMap<String, Player>,
    pub computers: BTreeMap<String, Device>,
    pub whiteboards: BTreeMap<String, Device>,
    pub meeting_rooms: BTreeMap<String, MeetingRoom>,
    pub messages: CircularQueue<MessageBoxItem>,
    pub viewer: MeetingViewer,
}

impl Default for State {
    fn default() -> Self {
        State {
            session_id: String::new(),
            office: None,
            players: BTreeMap::new(),
            computers: BTreeMap::new(),
            whiteboards: BTreeMap::new(),
            meeting_rooms: BTreeMap::new(),
            messages: CircularQueue::with_capacity(MAX_MESSAGES_TO_STORE),
            viewer: MeetingViewer::default(),
        }
    }
}

impl State {
    /// Replay one server event into the mirror, returning the domain
    /// notices it produced.
    pub fn handle_server_event(&mut self, event: &Event) -> Vec<Notice> {
        let mut notices = Vec::new();

        match event {
            Event::Welcome(welcome) => {
                self.session_id = welcome.session_id.clone();
                self.office = Some(welcome.office.clone());
                self.players = welcome.snapshot.players.clone();
                self.computers = welcome.snapshot.computers.clone();
                self.whiteboards = welcome.snapshot.whiteboards.clone();
                self.meeting_rooms = welcome.snapshot.meeting_rooms.clone();

                self.messages = CircularQueue::with_capacity(MAX_MESSAGES_TO_STORE);
                for message in &welcome.snapshot.chat_messages {
                    self.messages.push(MessageBoxItem::Message {
                        author: message.author.clone(),
                        content: message.content.clone(),
                    });
                }

                notices.push(Notice::JoinedOffice {
                    session_id: welcome.session_id.clone(),
                });
            }
            // the store loop terminates the session on rejection
            Event::JoinRejected(_) => {}
            Event::StateSync(sync) => {
                for delta in &sync.deltas {
                    self.apply_delta(delta, &mut notices);
                }
            }
            Event::ChatMessage(broadcast) => {
                notices.push(Notice::ChatBubble {
                    session_id: broadcast.session_id.clone(),
                    content: broadcast.content.clone(),
                });
            }
            Event::ScreenShareStopped(stopped) => {
                notices.push(Notice::ScreenShareStopped {
                    computer: stopped.computer.clone(),
                    session_id: stopped.session_id.clone(),
                });
            }
            Event::PresentationStarted(started) => {
                self.presentation_started(&started.meeting_room, &started.presenter, &mut notices);
            }
            Event::PresentationStopped(stopped) => {
                self.presentation_stopped(&stopped.meeting_room, &mut notices);
            }
            // signaling traffic is routed to the presentation controller,
            // it never touches the mirror
            Event::PresenterOffer(_) | Event::PresenterAnswer(_) | Event::PresenterIceCandidate(_) => {}
            Event::StreamDisconnected(disconnected) => {
                if self.viewer.presenter.as_deref() == Some(disconnected.sender.as_str()) {
                    self.viewer.presenter_stream = None;
                }
            }
        }

        notices
    }

    fn apply_delta(&mut self, delta: &StateDelta, notices: &mut Vec<Notice>) {
        match delta {
            StateDelta::PlayerAdded { id, player } => {
                // a replayed add for a player the snapshot already carried
                // simply overwrites
                self.players.insert(id.clone(), player.clone());
            }
            StateDelta::PlayerUpdated { id, fields } => {
                let is_self = *id == self.session_id;
                let mut joined_name: Option<String> = None;
                let mut changed = false;

                let Some(player) = self.players.get_mut(id) else {
                    return;
                };

                for field in fields {
                    match field {
                        PlayerField::Position { x, y, anim } => {
                            // own movement renders optimistically, the echo
                            // is suppressed
                            if is_self {
                                continue;
                            }

                            player.x = *x;
                            player.y = *y;
                            player.anim = anim.clone();
                            changed = true;
                        }
                        PlayerField::Name { name } => {
                            if !name.is_empty() && player.name != *name {
                                joined_name = Some(name.clone());
                            }

                            player.name = name.clone();
                            changed = true;
                        }
                        PlayerField::ReadyToConnect => {
                            player.ready_to_connect = true;
                            changed = true;
                        }
                        PlayerField::VideoConnected => {
                            player.video_connected = true;
                            changed = true;
                        }
                    }
                }

                if let Some(name) = joined_name {
                    if !is_self {
                        self.messages
                            .push(MessageBoxItem::Notification(format!("{} joined the office", name)));
                        notices.push(Notice::PlayerJoined {
                            session_id: id.clone(),
                            name,
                        });
                    }
                }

                if changed && !is_self {
                    notices.push(Notice::PlayerUpdated {
                        session_id: id.clone(),
                    });
                }
            }
            StateDelta::PlayerRemoved { id } => {
                if let Some(player) = self.players.remove(id) {
                    if !player.name.is_empty() {
                        self.messages.push(MessageBoxItem::Notification(format!(
                            "{} left the office",
                            player.name
                        )));
                    }

                    notices.push(Notice::PlayerLeft {
                        session_id: id.clone(),
                    });
                }
            }
            StateDelta::DeviceUserAdded { kind, id, user } => {
                let devices = match kind {
                    DeviceKind::Computer => &mut self.computers,
                    DeviceKind::Whiteboard => &mut self.whiteboards,
                };

                if let Some(device) = devices.get_mut(id) {
                    if device.connected_users.insert(user.clone()) {
                        notices.push(Notice::DeviceUserAdded {
                            kind: *kind,
                            device: id.clone(),
                            session_id: user.clone(),
                        });
                    }
                }
            }
            StateDelta::DeviceUserRemoved { kind, id, user } => {
                let devices = match kind {
                    DeviceKind::Computer => &mut self.computers,
                    DeviceKind::Whiteboard => &mut self.whiteboards,
                };

                if let Some(device) = devices.get_mut(id) {
                    if device.connected_users.remove(user) {
                        notices.push(Notice::DeviceUserRemoved {
                            kind: *kind,
                            device: id.clone(),
                            session_id: user.clone(),
                        });
                    }
                }
            }
            StateDelta::AttendeeAdded { meeting_room, user } => {
                if let Some(room) = self.meeting_rooms.get_mut(meeting_room) {
                    if room.attendees.insert(user.clone()) {
                        notices.push(Notice::AttendeeCountChanged {
                            meeting_room: meeting_room.clone(),
                            count: room.attendees.len(),
                        });
                    }
                }
            }
            StateDelta::AttendeeRemoved { meeting_room, user } => {
                if let Some(room) = self.meeting_rooms.get_mut(meeting_room) {
                    if room.attendees.remove(user) {
                        notices.push(Notice::AttendeeCountChanged {
                            meeting_room: meeting_room.clone(),
                            count: room.attendees.len(),
                        });
                    }
                }
            }
            StateDelta::PresenterChanged {
                meeting_room,
                presenter,
                is_active,
            } => {
                if let Some(room) = self.meeting_rooms.get_mut(meeting_room) {
                    room.presenter_id = presenter.clone();
                    room.is_active = *is_active;
                }
            }
            StateDelta::ChatMessageAppended { message } => {
                self.messages.push(MessageBoxItem::Message {
                    author: message.author.clone(),
                    content: message.content.clone(),
                });
            }
        }
    }

    fn presentation_started(&mut self, meeting_room: &str, presenter: &str, notices: &mut Vec<Notice>) {
        // fold the notice into the mirrored room record right away; the
        // replicated presenter delta re-applies the same values next tick
        if let Some(room) = self.meeting_rooms.get_mut(meeting_room) {
            room.presenter_id = presenter.to_string();
            room.is_active = true;
        }

        if presenter == self.session_id {
            self.viewer.presenting = true;
        } else {
            let presenter_name = self
                .players
                .get(presenter)
                .map(|player| player.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| String::from("Someone"));

            self.messages.push(MessageBoxItem::Notification(format!(
                "{} started a presentation",
                presenter_name
            )));
        }

        let in_this_zone = self.viewer.in_zone
            && self.viewer.zone_meeting_room.as_deref() == Some(meeting_room);

        if in_this_zone && !self.viewer.open {
            self.viewer.open = true;
            self.viewer.meeting_room = Some(meeting_room.to_string());
            notices.push(Notice::ViewerOpened {
                meeting_room: meeting_room.to_string(),
            });
        }

        if self.viewer.meeting_room.as_deref() == Some(meeting_room) {
            self.viewer.presenter = Some(presenter.to_string());
        }

        notices.push(Notice::PresentationStarted {
            meeting_room: meeting_room.to_string(),
            presenter: presenter.to_string(),
        });
    }

    fn presentation_stopped(&mut self, meeting_room: &str, notices: &mut Vec<Notice>) {
        if let Some(room) = self.meeting_rooms.get_mut(meeting_room) {
            room.presenter_id.clear();
            room.is_active = false;
        }

        if self.viewer.meeting_room.as_deref() == Some(meeting_room) {
            self.viewer.presenter = None;
            self.viewer.presenter_stream = None;
        }

        self.messages
            .push(MessageBoxItem::Notification(String::from(
                "The presentation has ended",
            )));

        notices.push(Notice::PresentationStopped {
            meeting_room: meeting_room.to_string(),
        });
    }

    /// External zone-presence signal: the avatar entered the zone around a
    /// meeting room. If a presentation is already known to run there, the
    /// viewer opens right away; otherwise the started notice will open it.
    /// Either ordering converges to an open viewer bound to this room.
    ///
    /// The mirrored room record is the only source consulted here; started
    /// and stopped notices fold into it on arrival, so it is current even
    /// before the replicated delta lands.
    pub fn enter_meeting_zone(&mut self, meeting_room: &str) -> Vec<Notice> {
        let mut notices = Vec::new();

        self.viewer.in_zone = true;
        self.viewer.zone_meeting_room = Some(meeting_room.to_string());

        let known_presenter = self
            .meeting_rooms
            .get(meeting_room)
            .and_then(|room| room.presenter())
            .map(String::from);

        if let Some(presenter) = known_presenter {
            if !self.viewer.open {
                self.viewer.open = true;
                self.viewer.meeting_room = Some(meeting_room.to_string());
                self.viewer.presenter = Some(presenter);

                notices.push(Notice::ViewerOpened {
                    meeting_room: meeting_room.to_string(),
                });
            }
        }

        notices
    }

    pub fn leave_meeting_zone(&mut self) {
        self.viewer.in_zone = false;
        self.viewer.zone_meeting_room = None;
    }

    /// The user opened the viewer themselves.
    pub fn open_viewer(&mut self, meeting_room: &str) {
        self.viewer.open = true;
        self.viewer.meeting_room = Some(meeting_room.to_string());
    }

    /// Closing the viewer clears everything presenter-bound; the stream
    /// handles themselves are torn down by the presentation controller.
    pub fn close_viewer(&mut self) {
        self.viewer.open = false;
        self.viewer.meeting_room = None;
        self.viewer.presenter = None;
        self.viewer.presenting = false;
        self.viewer.my_stream = None;
        self.viewer.presenter_stream = None;
    }

    pub fn start_presenting(&mut self, stream: StreamHandle) {
        self.viewer.presenting = true;
        self.viewer.my_stream = Some(stream);
    }

    pub fn stop_presenting(&mut self) {
        self.viewer.presenting = false;
        self.viewer.my_stream = None;
    }

    /// An inbound peer link delivered the presenter's stream.
    pub fn presenter_stream_ready(&mut self, from: &str, stream: StreamHandle) -> Vec<Notice> {
        self.viewer.presenter_stream = Some(stream);

        vec![Notice::PresenterStreamReady {
            from: String::from(from),
        }]
    }

    /// Local movement applies immediately; the replicated echo for our own
    /// player is suppressed on arrival.
    pub fn apply_local_move(&mut self, x: f32, y: f32, anim: &str) {
        let session_id = self.session_id.clone();

        if let Some(player) = self.players.get_mut(&session_id) {
            player.x = x;
            player.y = y;
            player.anim = anim.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms::event::{
        PresentationStartedEvent, StateSyncBroadcastEvent, WelcomeReplyEvent,
    };
    use comms::state::{ChatMessage, StateSnapshot};

    fn welcome(session_id: &str) -> Event {
        let mut snapshot = StateSnapshot::default();
        snapshot
            .meeting_rooms
            .insert("0".to_string(), MeetingRoom::default());
        snapshot
            .meeting_rooms
            .insert("1".to_string(), MeetingRoom::default());
        snapshot.chat_messages.push(ChatMessage {
            author: "ada".to_string(),
            content: "welcome!".to_string(),
            created_at: 1,
        });

        Event::Welcome(WelcomeReplyEvent {
            session_id: session_id.to_string(),
            office: OfficeDetail {
                id: "office-1".to_string(),
                name: "Public Office".to_string(),
                description: "test".to_string(),
            },
            snapshot,
        })
    }

    fn sync(deltas: Vec<StateDelta>) -> Event {
        Event::StateSync(StateSyncBroadcastEvent { deltas })
    }

    fn started(meeting_room: &str, presenter: &str) -> Event {
        Event::PresentationStarted(PresentationStartedEvent {
            meeting_room: meeting_room.to_string(),
            presenter: presenter.to_string(),
            attendees: None,
        })
    }

    fn state_with_session(session_id: &str) -> State {
        let mut state = State::default();
        state.handle_server_event(&welcome(session_id));
        state
    }

    #[test]
    fn test_welcome_replays_snapshot_and_history() {
        let mut state = State::default();
        let notices = state.handle_server_event(&welcome("session-me"));

        assert_eq!(state.session_id, "session-me");
        assert_eq!(state.office.as_ref().unwrap().name, "Public Office");
        assert_eq!(state.meeting_rooms.len(), 2);
        assert_eq!(state.messages.len(), 1);
        assert!(matches!(&notices[0], Notice::JoinedOffice { session_id } if session_id == "session-me"));
    }

    #[test]
    fn test_own_position_echo_is_suppressed() {
        let mut state = state_with_session("session-me");
        state.handle_server_event(&sync(vec![StateDelta::PlayerAdded {
            id: "session-me".to_string(),
            player: Player::default(),
        }]));

        state.apply_local_move(10.0, 20.0, "run_up");

        // a stale echo from before the local move arrives afterwards
        let notices = state.handle_server_event(&sync(vec![StateDelta::PlayerUpdated {
            id: "session-me".to_string(),
            fields: vec![PlayerField::Position {
                x: 1.0,
                y: 2.0,
                anim: "idle".to_string(),
            }],
        }]));

        let me = state.players.get("session-me").unwrap();
        assert_eq!((me.x, me.y), (10.0, 20.0));
        assert_eq!(me.anim, "run_up");
        assert!(notices.is_empty());
    }

    #[test]
    fn test_remote_player_naming_raises_joined_notice_once() {
        let mut state = state_with_session("session-me");
        state.handle_server_event(&sync(vec![StateDelta::PlayerAdded {
            id: "session-b".to_string(),
            player: Player::default(),
        }]));

        let notices = state.handle_server_event(&sync(vec![StateDelta::PlayerUpdated {
            id: "session-b".to_string(),
            fields: vec![PlayerField::Name {
                name: "grace".to_string(),
            }],
        }]));

        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::PlayerJoined { name, .. } if name == "grace")));

        // replaying the same name must not announce a second join
        let notices = state.handle_server_event(&sync(vec![StateDelta::PlayerUpdated {
            id: "session-b".to_string(),
            fields: vec![PlayerField::Name {
                name: "grace".to_string(),
            }],
        }]));

        assert!(!notices
            .iter()
            .any(|notice| matches!(notice, Notice::PlayerJoined { .. })));
    }

    #[test]
    fn test_presentation_then_zone_enter_opens_the_viewer() {
        let mut state = state_with_session("session-me");

        let notices = state.handle_server_event(&started("0", "session-a"));
        assert!(!state.viewer.open);
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::PresentationStarted { .. })));

        let notices = state.enter_meeting_zone("0");

        assert!(state.viewer.open);
        assert_eq!(state.viewer.meeting_room.as_deref(), Some("0"));
        assert_eq!(state.viewer.presenter.as_deref(), Some("session-a"));
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::ViewerOpened { meeting_room } if meeting_room == "0")));
    }

    #[test]
    fn test_zone_enter_then_presentation_opens_the_viewer() {
        let mut state = state_with_session("session-me");

        assert!(state.enter_meeting_zone("0").is_empty());
        assert!(!state.viewer.open);

        let notices = state.handle_server_event(&started("0", "session-a"));

        assert!(state.viewer.open);
        assert_eq!(state.viewer.meeting_room.as_deref(), Some("0"));
        assert_eq!(state.viewer.presenter.as_deref(), Some("session-a"));
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::ViewerOpened { meeting_room } if meeting_room == "0")));
    }

    #[test]
    fn test_presentation_in_another_room_does_not_open_the_viewer() {
        let mut state = state_with_session("session-me");
        state.enter_meeting_zone("0");

        let notices = state.handle_server_event(&started("1", "session-a"));

        assert!(!state.viewer.open);
        assert!(!notices
            .iter()
            .any(|notice| matches!(notice, Notice::ViewerOpened { .. })));

        // entering the other zone still picks the presentation up
        state.leave_meeting_zone();
        state.enter_meeting_zone("1");
        assert!(state.viewer.open);
        assert_eq!(state.viewer.meeting_room.as_deref(), Some("1"));
    }

    #[test]
    fn test_zone_enter_learns_about_presentations_from_the_mirror() {
        // the replicated room record alone, without a started notice, is
        // enough for the auto-open on zone entry
        let mut state = state_with_session("session-me");
        state.handle_server_event(&sync(vec![StateDelta::PresenterChanged {
            meeting_room: "1".to_string(),
            presenter: "session-a".to_string(),
            is_active: true,
        }]));

        state.enter_meeting_zone("1");

        assert!(state.viewer.open);
        assert_eq!(state.viewer.meeting_room.as_deref(), Some("1"));
        assert_eq!(state.viewer.presenter.as_deref(), Some("session-a"));
    }

    #[test]
    fn test_stop_notice_clears_presenter_but_keeps_viewer_open() {
        let mut state = state_with_session("session-me");
        state.enter_meeting_zone("0");
        state.handle_server_event(&started("0", "session-a"));
        state.presenter_stream_ready("session-a", StreamHandle::new(7));

        state.handle_server_event(&Event::PresentationStopped(
            comms::event::PresentationStoppedEvent {
                meeting_room: "0".to_string(),
            },
        ));

        assert!(state.viewer.open);
        assert_eq!(state.viewer.presenter, None);
        assert_eq!(state.viewer.presenter_stream, None);
    }

    #[test]
    fn test_attendee_deltas_track_the_count() {
        let mut state = state_with_session("session-me");

        let notices = state.handle_server_event(&sync(vec![
            StateDelta::AttendeeAdded {
                meeting_room: "0".to_string(),
                user: "session-a".to_string(),
            },
            StateDelta::AttendeeAdded {
                meeting_room: "0".to_string(),
                user: "session-b".to_string(),
            },
            // a replayed membership change is absorbed silently
            StateDelta::AttendeeAdded {
                meeting_room: "0".to_string(),
                user: "session-b".to_string(),
            },
        ]));

        let counts: Vec<usize> = notices
            .iter()
            .filter_map(|notice| match notice {
                Notice::AttendeeCountChanged { count, .. } => Some(*count),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_chat_log_is_bounded() {
        let mut state = state_with_session("session-me");

        for i in 0..(MAX_MESSAGES_TO_STORE + 10) {
            state.handle_server_event(&sync(vec![StateDelta::ChatMessageAppended {
                message: ChatMessage {
                    author: "ada".to_string(),
                    content: format!("message {}", i),
                    created_at: i as i64,
                },
            }]));
        }

        assert_eq!(state.messages.len(), MAX_MESSAGES_TO_STORE);
    }

    #[test]
    fn test_player_departure_is_announced() {
        let mut state = state_with_session("session-me");
        state.handle_server_event(&sync(vec![
            StateDelta::PlayerAdded {
                id: "session-b".to_string(),
                player: Player::default(),
            },
            StateDelta::PlayerUpdated {
                id: "session-b".to_string(),
                fields: vec![PlayerField::Name {
                    name: "grace".to_string(),
                }],
            },
        ]));

        let notices = state.handle_server_event(&sync(vec![StateDelta::PlayerRemoved {
            id: "session-b".to_string(),
        }]));

        assert!(state.players.get("session-b").is_none());
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::PlayerLeft { session_id } if session_id == "session-b")));
    }
}
