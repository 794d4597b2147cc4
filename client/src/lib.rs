/// Abstract media-capture and peer-connection capabilities; the media
/// itself never passes through this crate
pub mod media;
/// Presentation controller driving the presenter/attendee call flow over
/// the media capabilities
pub mod meeting;
/// The client-side state projector: a replicated-state mirror and the
/// store main loop feeding the rendering layer
pub mod state_store;
/// Interrupt plumbing shared by the binary and the store loop
pub mod termination;

pub use termination::{create_termination, Interrupted, Terminator};
