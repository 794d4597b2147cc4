use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User Command for joining the office. Must be the first command sent on a
/// fresh connection; the optional password is compared against the office's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCommand {
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// User Command overwriting the player's position and animation tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlayerCommand {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "a")]
    pub anim: String,
}

/// User Command setting the player's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatePlayerNameCommand {
    #[serde(rename = "n")]
    pub name: String,
}

/// User Command marking the player as ready to accept proximity calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyToConnectCommand;

/// User Command marking the player's video as connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConnectedCommand;

/// User Command for connecting to a shared computer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectToComputerCommand {
    #[serde(rename = "c")]
    pub computer: String,
}

/// User Command for disconnecting from a shared computer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectFromComputerCommand {
    #[serde(rename = "c")]
    pub computer: String,
}

/// User Command telling the other users of a computer that the sender
/// stopped sharing their screen on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopScreenShareCommand {
    #[serde(rename = "c")]
    pub computer: String,
}

/// User Command for connecting to a shared whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectToWhiteboardCommand {
    #[serde(rename = "w")]
    pub whiteboard: String,
}

/// User Command for disconnecting from a shared whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectFromWhiteboardCommand {
    #[serde(rename = "w")]
    pub whiteboard: String,
}

/// User Command appending a message to the office chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddChatMessageCommand {
    #[serde(rename = "c")]
    pub content: String,
}

/// User Command for joining a meeting room as an attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinMeetingRoomCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
}

/// User Command for leaving a meeting room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveMeetingRoomCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
}

/// User Command requesting to become the presenter of a meeting room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPresentationCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
}

/// User Command stopping the sender's own presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopPresentationCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
}

/// User Command relaying a connection offer to one attendee. The payload is
/// opaque to the server; the receiver sees the sender's real session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterOfferCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
    #[serde(rename = "to")]
    pub target: String,
    #[serde(rename = "pl")]
    pub payload: Value,
}

/// User Command relaying a connection answer back to the presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterAnswerCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
    #[serde(rename = "to")]
    pub target: String,
    #[serde(rename = "pl")]
    pub payload: Value,
}

/// User Command relaying an ICE candidate to the other end of a peer link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterIceCandidateCommand {
    #[serde(rename = "m")]
    pub meeting_room: String,
    #[serde(rename = "to")]
    pub target: String,
    #[serde(rename = "pl")]
    pub payload: Value,
}

/// User Command telling one peer that the sender tore down their stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectStreamCommand {
    #[serde(rename = "to")]
    pub target: String,
}

/// User Command for quitting the office session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A user command which can be sent to the server by a single user session.
/// All commands are processed in the context of the office paired with an individual user session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum UserCommand {
    Join(JoinCommand),
    UpdatePlayer(UpdatePlayerCommand),
    UpdatePlayerName(UpdatePlayerNameCommand),
    ReadyToConnect(ReadyToConnectCommand),
    VideoConnected(VideoConnectedCommand),
    ConnectToComputer(ConnectToComputerCommand),
    DisconnectFromComputer(DisconnectFromComputerCommand),
    StopScreenShare(StopScreenShareCommand),
    ConnectToWhiteboard(ConnectToWhiteboardCommand),
    DisconnectFromWhiteboard(DisconnectFromWhiteboardCommand),
    AddChatMessage(AddChatMessageCommand),
    JoinMeetingRoom(JoinMeetingRoomCommand),
    LeaveMeetingRoom(LeaveMeetingRoomCommand),
    StartPresentation(StartPresentationCommand),
    StopPresentation(StopPresentationCommand),
    PresenterOffer(PresenterOfferCommand),
    PresenterAnswer(PresenterAnswerCommand),
    PresenterIceCandidate(PresenterIceCandidateCommand),
    DisconnectStream(DisconnectStreamCommand),
    Quit(QuitCommand),
}
