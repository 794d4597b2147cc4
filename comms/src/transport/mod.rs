/// Client half of the TCP transport: a stream of office events plus a
/// command writer
#[cfg(feature = "client")]
pub mod client;
/// Line-delimited JSON codec shared by both halves
#[cfg(any(feature = "client", feature = "server"))]
mod common;
/// Server half of the TCP transport: a stream of user commands plus an
/// event writer for a single session
#[cfg(feature = "server")]
pub mod server;
