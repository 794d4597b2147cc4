/// Actions the rendering and input layer can feed into the store loop.
#[derive(Debug, Clone)]
pub enum Action {
    MovePlayer { x: f32, y: f32, anim: String },
    SetName { name: String },
    SendChatMessage { content: String },
    ReadyToConnect,
    VideoConnected,
    UseComputer { computer: String },
    LeaveComputer { computer: String },
    StopScreenShare { computer: String },
    UseWhiteboard { whiteboard: String },
    LeaveWhiteboard { whiteboard: String },
    /// External zone-presence signal: the avatar walked into the zone
    /// around a meeting room
    EnterMeetingZone { meeting_room: String },
    LeaveMeetingZone,
    /// The user opened the meeting viewer themselves, which also joins the
    /// room as an attendee
    OpenMeetingViewer { meeting_room: String },
    CloseMeetingViewer,
    StartPresentation { meeting_room: String },
    StopPresentation,
    DisconnectStream { target: String },
    Exit,
}
