use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{decoded_lines, BoxedStream, FrameWriter};

/// [CommandStream] is a stream of [crate::command::UserCommand]s sent by the client
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing commands.
pub type CommandStream = BoxedStream<anyhow::Result<command::UserCommand>>;

/// [EventWriter] is a wrapper around a [TcpStream] which writes [crate::event::Event]s to the client
pub struct EventWriter {
    writer: FrameWriter,
}

impl EventWriter {
    /// Send a [crate::event::Event] to the backing [TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe; see [super::common::FrameWriter::write].
    pub async fn write(&mut self, event: &event::Event) -> anyhow::Result<()> {
        self.writer.write(event).await
    }
}

/// Splits a TCP stream into a stream of commands and an event writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (CommandStream, EventWriter) {
    let (reader, writer) = stream.into_split();

    (
        decoded_lines(reader, "client"),
        EventWriter {
            writer: FrameWriter::new(writer),
        },
    )
}
