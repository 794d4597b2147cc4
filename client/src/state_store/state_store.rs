use anyhow::Context;
use comms::command::{
    AddChatMessageCommand, ConnectToComputerCommand, ConnectToWhiteboardCommand,
    DisconnectFromComputerCommand, DisconnectFromWhiteboardCommand, DisconnectStreamCommand,
    JoinCommand, JoinMeetingRoomCommand, LeaveMeetingRoomCommand, PresenterAnswerCommand,
    PresenterIceCandidateCommand, PresenterOfferCommand, QuitCommand, ReadyToConnectCommand,
    StartPresentationCommand, StopPresentationCommand, StopScreenShareCommand,
    UpdatePlayerCommand, UpdatePlayerNameCommand, UserCommand, VideoConnectedCommand,
};
use comms::event::Event;
use comms::transport::client::{CommandWriter, EventStream};
use tokio::sync::{
    broadcast,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_stream::StreamExt;
use tracing::warn;

use crate::media::PeerSignal;
use crate::meeting::PresentationController;
use crate::{Interrupted, Terminator};

use super::{action::Action, Notice, State};

/// The client-side projector's main loop owner.
///
/// It replays server events into the [State] mirror, translates rendering
/// layer [Action]s into commands, shuttles signaling between the server and
/// the presentation controller, and publishes a fresh state clone after
/// every change.
pub struct StateStore {
    state_tx: UnboundedSender<State>,
}

impl StateStore {
    pub fn new() -> (Self, UnboundedReceiver<State>) {
        let (state_tx, state_rx) = mpsc::unbounded_channel::<State>();

        (StateStore { state_tx }, state_rx)
    }
}

pub type ServerHandle = (EventStream, CommandWriter);

impl StateStore {
    pub async fn main_loop(
        self,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<Action>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
        server: ServerHandle,
        mut controller: PresentationController,
        notice_tx: broadcast::Sender<Notice>,
        password: Option<String>,
    ) -> anyhow::Result<Interrupted> {
        let (mut event_stream, mut command_writer) = server;
        let mut outgoing_signals = controller
            .take_outgoing()
            .context("the peer connector's outgoing channel was already taken")?;
        let mut incoming_calls = controller
            .take_incoming()
            .context("the peer connector's incoming channel was already taken")?;

        let mut state = State::default();

        // joining must precede everything else, so the welcome snapshot is
        // the first event this loop observes
        command_writer
            .write(&UserCommand::Join(JoinCommand { password }))
            .await
            .context("could not send the join command")?;

        // the initial state once
        self.state_tx.send(state.clone())?;

        let result = loop {
            tokio::select! {
                // Handle the server events as they come in
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(event)) => {
                        if let Event::JoinRejected(rejected) = &event {
                            warn!(reason = ?rejected.reason, "the office refused the join");
                            let _ = terminator.terminate(Interrupted::ServerClosed);

                            break Interrupted::ServerClosed;
                        }

                        match &event {
                            Event::PresentationStarted(started) => {
                                controller
                                    .handle_started(&started.meeting_room, started.attendees.as_deref())
                                    .await;
                            }
                            Event::PresentationStopped(stopped) => {
                                controller.handle_stopped(&stopped.meeting_room).await;
                            }
                            Event::PresenterOffer(signal) => {
                                controller
                                    .deliver_signal(&signal.sender, PeerSignal::Offer(signal.payload.clone()))
                                    .await;
                            }
                            Event::PresenterAnswer(signal) => {
                                controller
                                    .deliver_signal(&signal.sender, PeerSignal::Answer(signal.payload.clone()))
                                    .await;
                            }
                            Event::PresenterIceCandidate(signal) => {
                                controller
                                    .deliver_signal(&signal.sender, PeerSignal::IceCandidate(signal.payload.clone()))
                                    .await;
                            }
                            Event::StreamDisconnected(disconnected) => {
                                controller.peer_closed(&disconnected.sender).await;
                            }
                            _ => {}
                        }

                        for notice in state.handle_server_event(&event) {
                            let _ = notice_tx.send(notice);
                        }
                    },
                    // a malformed frame is dropped, the stream stays alive
                    Some(Err(err)) => {
                        warn!("dropping malformed event: {:#}", err);
                    },
                    // server disconnected, there is nothing to project anymore
                    None => {
                        let _ = terminator.terminate(Interrupted::ServerClosed);

                        break Interrupted::ServerClosed;
                    },
                },
                // Handle the actions coming from the rendering and input layer
                Some(action) = action_rx.recv() => match action {
                    Action::MovePlayer { x, y, anim } => {
                        state.apply_local_move(x, y, &anim);
                        command_writer
                            .write(&UserCommand::UpdatePlayer(UpdatePlayerCommand { x, y, anim }))
                            .await
                            .context("could not send the position update")?;
                    },
                    Action::SetName { name } => {
                        command_writer
                            .write(&UserCommand::UpdatePlayerName(UpdatePlayerNameCommand { name }))
                            .await
                            .context("could not send the rename")?;
                    },
                    Action::SendChatMessage { content } => {
                        command_writer
                            .write(&UserCommand::AddChatMessage(AddChatMessageCommand { content }))
                            .await
                            .context("could not send the chat message")?;
                    },
                    Action::ReadyToConnect => {
                        command_writer
                            .write(&UserCommand::ReadyToConnect(ReadyToConnectCommand))
                            .await
                            .context("could not send the readiness flag")?;
                    },
                    Action::VideoConnected => {
                        command_writer
                            .write(&UserCommand::VideoConnected(VideoConnectedCommand))
                            .await
                            .context("could not send the readiness flag")?;
                    },
                    Action::UseComputer { computer } => {
                        command_writer
                            .write(&UserCommand::ConnectToComputer(ConnectToComputerCommand { computer }))
                            .await
                            .context("could not send the device connect")?;
                    },
                    Action::LeaveComputer { computer } => {
                        command_writer
                            .write(&UserCommand::DisconnectFromComputer(DisconnectFromComputerCommand { computer }))
                            .await
                            .context("could not send the device disconnect")?;
                    },
                    Action::StopScreenShare { computer } => {
                        command_writer
                            .write(&UserCommand::StopScreenShare(StopScreenShareCommand { computer }))
                            .await
                            .context("could not send the screen share stop")?;
                    },
                    Action::UseWhiteboard { whiteboard } => {
                        command_writer
                            .write(&UserCommand::ConnectToWhiteboard(ConnectToWhiteboardCommand { whiteboard }))
                            .await
                            .context("could not send the device connect")?;
                    },
                    Action::LeaveWhiteboard { whiteboard } => {
                        command_writer
                            .write(&UserCommand::DisconnectFromWhiteboard(DisconnectFromWhiteboardCommand { whiteboard }))
                            .await
                            .context("could not send the device disconnect")?;
                    },
                    Action::EnterMeetingZone { meeting_room } => {
                        for notice in state.enter_meeting_zone(&meeting_room) {
                            let _ = notice_tx.send(notice);
                        }
                    },
                    Action::LeaveMeetingZone => {
                        state.leave_meeting_zone();
                    },
                    Action::OpenMeetingViewer { meeting_room } => {
                        state.open_viewer(&meeting_room);
                        command_writer
                            .write(&UserCommand::JoinMeetingRoom(JoinMeetingRoomCommand { meeting_room }))
                            .await
                            .context("could not send the meeting room join")?;
                    },
                    Action::CloseMeetingViewer => {
                        let meeting_room = state.viewer.meeting_room.clone();

                        if state.viewer.presenting {
                            controller.stop().await;

                            if let Some(meeting_room) = meeting_room.clone() {
                                command_writer
                                    .write(&UserCommand::StopPresentation(StopPresentationCommand { meeting_room }))
                                    .await
                                    .context("could not send the presentation stop")?;
                            }
                        }

                        if let Some(meeting_room) = meeting_room {
                            command_writer
                                .write(&UserCommand::LeaveMeetingRoom(LeaveMeetingRoomCommand { meeting_room }))
                                .await
                                .context("could not send the meeting room leave")?;
                        }

                        state.close_viewer();
                    },
                    Action::StartPresentation { meeting_room } => {
                        match controller.start(&meeting_room).await {
                            Ok(Some(stream)) => {
                                state.start_presenting(stream);
                                command_writer
                                    .write(&UserCommand::StartPresentation(StartPresentationCommand { meeting_room }))
                                    .await
                                    .context("could not send the presentation start")?;
                            },
                            Ok(None) => {},
                            // a denied capture grant leaves everything as it was
                            Err(err) => warn!("could not start presenting: {:#}", err),
                        }
                    },
                    Action::StopPresentation => {
                        if state.viewer.presenting {
                            controller.stop().await;
                            state.stop_presenting();

                            if let Some(meeting_room) = state.viewer.meeting_room.clone() {
                                command_writer
                                    .write(&UserCommand::StopPresentation(StopPresentationCommand { meeting_room }))
                                    .await
                                    .context("could not send the presentation stop")?;
                            }
                        }
                    },
                    Action::DisconnectStream { target } => {
                        controller.peer_closed(&target).await;
                        command_writer
                            .write(&UserCommand::DisconnectStream(DisconnectStreamCommand { target }))
                            .await
                            .context("could not send the stream disconnect")?;
                    },
                    Action::Exit => {
                        let _ = command_writer.write(&UserCommand::Quit(QuitCommand)).await;
                        let _ = terminator.terminate(Interrupted::UserInt);

                        break Interrupted::UserInt;
                    },
                },
                // Signals the media layer wants relayed through the server
                Some(outgoing) = outgoing_signals.recv() => {
                    let meeting_room = state.viewer.meeting_room.clone().unwrap_or_default();
                    let command = match outgoing.signal {
                        PeerSignal::Offer(payload) => UserCommand::PresenterOffer(PresenterOfferCommand {
                            meeting_room,
                            target: outgoing.target,
                            payload,
                        }),
                        PeerSignal::Answer(payload) => UserCommand::PresenterAnswer(PresenterAnswerCommand {
                            meeting_room,
                            target: outgoing.target,
                            payload,
                        }),
                        PeerSignal::IceCandidate(payload) => UserCommand::PresenterIceCandidate(PresenterIceCandidateCommand {
                            meeting_room,
                            target: outgoing.target,
                            payload,
                        }),
                    };

                    command_writer
                        .write(&command)
                        .await
                        .context("could not relay the signaling message")?;
                },
                // An inbound peer link became ready with the presenter's stream
                Some(call) = incoming_calls.recv() => {
                    for notice in state.presenter_stream_ready(&call.from, call.stream) {
                        let _ = notice_tx.send(notice);
                    }
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break interrupted;
                }
            }

            self.state_tx.send(state.clone())?;
        };

        Ok(result)
    }
}
