use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use comms::command::UserCommand;
use comms::event::{
    ChatMessageBroadcastEvent, Event, OfficeDetail, ScreenShareStoppedEvent,
    StateSyncBroadcastEvent, WelcomeReplyEvent,
};
use comms::state::DeviceKind;
use nanoid::nanoid;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

mod lifecycle;
mod meeting;
mod signaling;
mod state;
mod topic;

use self::state::OfficeState;

const COMMAND_QUEUE_CAPACITY: usize = 256;
/// Capacity of each session's outbound event channel. A session that cannot
/// drain this many events is considered backlogged and loses events rather
/// than stalling the dispatcher.
pub const OUTBOUND_EVENT_CAPACITY: usize = 256;

/// All live connections of an office instance, keyed by session id. The
/// signaling relay and every notification fanout deliver through this map.
pub(crate) type ConnectionMap = BTreeMap<String, mpsc::Sender<Event>>;

/// Fixed details of an office instance.
#[derive(Debug, Clone)]
pub struct OfficeMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub password: Option<String>,
}

impl OfficeMetadata {
    pub fn new(name: &str, description: &str, password: Option<String>) -> Self {
        OfficeMetadata {
            id: nanoid!(),
            name: String::from(name),
            description: String::from(description),
            password,
        }
    }
}

/// Why a session was refused at the door.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("password is incorrect")]
    InvalidPassword,
}

impl From<JoinError> for comms::event::JoinRejectedReason {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::InvalidPassword => comms::event::JoinRejectedReason::InvalidPassword,
        }
    }
}

/// An inbound request for the office dispatcher, submitted by session tasks.
#[derive(Debug)]
enum Envelope {
    Connect {
        session_id: String,
        password: Option<String>,
        outbound: mpsc::Sender<Event>,
        reply: oneshot::Sender<Result<(), JoinError>>,
    },
    Disconnect {
        session_id: String,
    },
    Command {
        session_id: String,
        command: UserCommand,
    },
}

/// One office instance: the canonical state plus the connection registry,
/// owned by a single task.
///
/// Envelopes are processed strictly one at a time, so every command runs to
/// completion before the next starts and no mutation needs a lock. The
/// replication tick interleaves only between envelopes, never inside one.
#[derive(Debug)]
pub struct Office {
    metadata: OfficeMetadata,
    state: OfficeState,
    connections: ConnectionMap,
}

/// Cloneable submission handle for an office instance's dispatcher queue.
#[derive(Debug, Clone)]
pub struct OfficeHandle {
    tx: mpsc::Sender<Envelope>,
}

impl OfficeHandle {
    /// Register a session. On success the session's outbound channel first
    /// receives the welcome snapshot, then every later replication batch.
    pub async fn connect(
        &self,
        session_id: &str,
        password: Option<String>,
        outbound: mpsc::Sender<Event>,
    ) -> anyhow::Result<Result<(), JoinError>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Envelope::Connect {
                session_id: String::from(session_id),
                password,
                outbound,
                reply: reply_tx,
            })
            .await
            .context("office is no longer running")?;

        reply_rx.await.context("office dropped the join reply")
    }

    pub async fn disconnect(&self, session_id: &str) -> anyhow::Result<()> {
        self.tx
            .send(Envelope::Disconnect {
                session_id: String::from(session_id),
            })
            .await
            .context("office is no longer running")
    }

    pub async fn command(&self, session_id: &str, command: UserCommand) -> anyhow::Result<()> {
        self.tx
            .send(Envelope::Command {
                session_id: String::from(session_id),
                command,
            })
            .await
            .context("office is no longer running")
    }
}

impl Office {
    pub fn new(metadata: OfficeMetadata) -> Self {
        Office {
            metadata,
            state: OfficeState::new(),
            connections: ConnectionMap::new(),
        }
    }

    /// Spawn the office task and hand back its submission handle. The task
    /// winds down once every handle has been dropped.
    pub fn spawn(metadata: OfficeMetadata, tick_interval: Duration) -> OfficeHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        tokio::spawn(Office::new(metadata).run(rx, tick_interval));

        OfficeHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>, tick_interval: Duration) {
        let mut ticker = tokio::time::interval(tick_interval);

        loop {
            tokio::select! {
                maybe_envelope = rx.recv() => match maybe_envelope {
                    Some(envelope) => self.handle_envelope(envelope),
                    None => break,
                },
                _ = ticker.tick() => self.replicate(),
            }
        }

        info!(office = %self.metadata.id, "office dispatcher stopped");
    }

    fn handle_envelope(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Connect {
                session_id,
                password,
                outbound,
                reply,
            } => {
                let _ = reply.send(self.connect(&session_id, password, outbound));
            }
            Envelope::Disconnect { session_id } => {
                info!(session = %session_id, "session departed");
                lifecycle::session_departed(&mut self.state, &mut self.connections, &session_id);
            }
            Envelope::Command {
                session_id,
                command,
            } => self.handle_command(&session_id, command),
        }
    }

    fn connect(
        &mut self,
        session_id: &str,
        password: Option<String>,
        outbound: mpsc::Sender<Event>,
    ) -> Result<(), JoinError> {
        if self.metadata.password.is_some() && self.metadata.password != password {
            return Err(JoinError::InvalidPassword);
        }

        // The snapshot is taken before the player exists; the session learns
        // about its own player through the next replication batch, and every
        // event after the welcome flows through the same ordered channel.
        let welcome = Event::Welcome(WelcomeReplyEvent {
            session_id: String::from(session_id),
            office: self.detail(),
            snapshot: self.state.snapshot(),
        });

        if outbound.try_send(welcome).is_err() {
            warn!(session = %session_id, "could not deliver the welcome, refusing registration");
            return Ok(());
        }

        self.connections.insert(String::from(session_id), outbound);
        self.state.create_player(session_id);
        info!(session = %session_id, "session joined the office");

        Ok(())
    }

    fn handle_command(&mut self, session_id: &str, command: UserCommand) {
        match command {
            // a repeated join on an established session carries no meaning
            UserCommand::Join(_) | UserCommand::Quit(_) => {}
            UserCommand::UpdatePlayer(cmd) => {
                self.state
                    .update_player_position(session_id, cmd.x, cmd.y, &cmd.anim);
            }
            UserCommand::UpdatePlayerName(cmd) => {
                if cmd.name.is_empty() {
                    debug!(session = %session_id, "dropping empty rename");
                    return;
                }

                self.state.set_player_name(session_id, &cmd.name);
            }
            UserCommand::ReadyToConnect(_) => self.state.mark_ready_to_connect(session_id),
            UserCommand::VideoConnected(_) => self.state.mark_video_connected(session_id),
            UserCommand::ConnectToComputer(cmd) => {
                self.state
                    .add_device_user(DeviceKind::Computer, &cmd.computer, session_id);
            }
            UserCommand::DisconnectFromComputer(cmd) => {
                self.state
                    .remove_device_user(DeviceKind::Computer, &cmd.computer, session_id);
            }
            UserCommand::ConnectToWhiteboard(cmd) => {
                self.state
                    .add_device_user(DeviceKind::Whiteboard, &cmd.whiteboard, session_id);
            }
            UserCommand::DisconnectFromWhiteboard(cmd) => {
                self.state
                    .remove_device_user(DeviceKind::Whiteboard, &cmd.whiteboard, session_id);
            }
            UserCommand::StopScreenShare(cmd) => {
                let Some(users) = self.state.device_users(DeviceKind::Computer, &cmd.computer)
                else {
                    return;
                };

                let others: Vec<String> = users
                    .iter()
                    .filter(|user| user.as_str() != session_id)
                    .cloned()
                    .collect();

                for user in others {
                    signaling::deliver(
                        &self.connections,
                        &user,
                        Event::ScreenShareStopped(ScreenShareStoppedEvent {
                            computer: cmd.computer.clone(),
                            session_id: String::from(session_id),
                        }),
                    );
                }
            }
            UserCommand::AddChatMessage(cmd) => {
                let Some(author) = self
                    .state
                    .player(session_id)
                    .map(|player| player.name.clone())
                else {
                    return;
                };

                self.state
                    .append_chat(&author, &cmd.content, Utc::now().timestamp_millis());

                // everyone except the author also gets the message right
                // away for in-world display; the log itself replicates on
                // the next tick
                self.broadcast_except(
                    session_id,
                    Event::ChatMessage(ChatMessageBroadcastEvent {
                        session_id: String::from(session_id),
                        content: cmd.content,
                    }),
                );
            }
            UserCommand::JoinMeetingRoom(cmd) => {
                meeting::join(&mut self.state, &self.connections, session_id, &cmd.meeting_room);
            }
            UserCommand::LeaveMeetingRoom(cmd) => {
                meeting::leave(&mut self.state, &self.connections, session_id, &cmd.meeting_room);
            }
            UserCommand::StartPresentation(cmd) => {
                meeting::start(&mut self.state, &self.connections, session_id, &cmd.meeting_room);
            }
            UserCommand::StopPresentation(cmd) => {
                meeting::stop(&mut self.state, &self.connections, session_id, &cmd.meeting_room);
            }
            UserCommand::PresenterOffer(cmd) => {
                signaling::relay_offer(&self.connections, session_id, cmd);
            }
            UserCommand::PresenterAnswer(cmd) => {
                signaling::relay_answer(&self.connections, session_id, cmd);
            }
            UserCommand::PresenterIceCandidate(cmd) => {
                signaling::relay_ice_candidate(&self.connections, session_id, cmd);
            }
            UserCommand::DisconnectStream(cmd) => {
                signaling::relay_stream_disconnect(&self.connections, session_id, cmd);
            }
        }
    }

    /// One replication tick: every delta since the previous tick, in
    /// application order, to every live connection.
    fn replicate(&mut self) {
        let deltas = self.state.drain_deltas();
        if deltas.is_empty() {
            return;
        }

        let event = Event::StateSync(StateSyncBroadcastEvent { deltas });

        for (session_id, tx) in &self.connections {
            if tx.try_send(event.clone()).is_err() {
                debug!(session = %session_id, "dropping state sync for backlogged connection");
            }
        }
    }

    fn broadcast_except(&self, except: &str, event: Event) {
        for (session_id, tx) in &self.connections {
            if session_id == except {
                continue;
            }

            if tx.try_send(event.clone()).is_err() {
                debug!(session = %session_id, "dropping broadcast for backlogged connection");
            }
        }
    }

    fn detail(&self) -> OfficeDetail {
        OfficeDetail {
            id: self.metadata.id.clone(),
            name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
        }
    }
}
