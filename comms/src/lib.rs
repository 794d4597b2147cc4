/// Set of commands which the office server can receive and process
pub mod command;
/// Set of events the server sends back, split into replies, broadcasts and
/// point-to-point notices, plus the granular replication deltas they carry
pub mod event;
/// Replicated entity records shared by the server's canonical state, the
/// welcome snapshot and the client-side mirror
pub mod state;
/// Implementation of event and command transportation over TCP Streams.
/// Requires 'server' or 'client' features to be enabled and will bring in tokio dependency alongside with other dependencies
pub mod transport;
