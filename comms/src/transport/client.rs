use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{decoded_lines, BoxedStream, FrameWriter};

/// [EventStream] is a stream of [crate::event::Event]s sent by the server
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select]
/// without the risk of missing events.
pub type EventStream = BoxedStream<anyhow::Result<event::Event>>;

/// [CommandWriter] is a wrapper around a [TcpStream] which writes [crate::command::UserCommand]s to the server
pub struct CommandWriter {
    writer: FrameWriter,
}

impl CommandWriter {
    /// Send a [crate::command::UserCommand] to the backing [TcpStream]
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe; see [super::common::FrameWriter::write].
    pub async fn write(&mut self, command: &command::UserCommand) -> anyhow::Result<()> {
        self.writer.write(command).await
    }
}

/// Splits a TCP stream into a stream of events and a command writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (EventStream, CommandWriter) {
    let (reader, writer) = stream.into_split();

    (
        decoded_lines(reader, "server"),
        CommandWriter {
            writer: FrameWriter::new(writer),
        },
    )
}
