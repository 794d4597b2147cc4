use std::pin::Pin;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_stream::{wrappers::LinesStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

/// Frames larger than this are treated as malformed and dropped by the
/// reader instead of being buffered without bound.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Turns the read half of a TCP stream into a stream of decoded frames.
///
/// Each frame is one `\r\n`-terminated line holding a single JSON value.
/// Unreadable or oversized lines surface as `Err` items so the consumer can
/// drop them and keep the stream alive.
pub(super) fn decoded_lines<T>(reader: OwnedReadHalf, peer: &'static str) -> BoxedStream<anyhow::Result<T>>
where
    T: DeserializeOwned + 'static,
{
    Box::pin(
        LinesStream::new(BufReader::new(reader).lines()).map(move |line| {
            let line = line.with_context(|| format!("could not read line from the {}", peer))?;

            if line.len() > MAX_FRAME_BYTES {
                anyhow::bail!("dropping oversized frame from the {} ({} bytes)", peer, line.len());
            }

            serde_json::from_str::<T>(&line)
                .with_context(|| format!("failed to deserialize frame from the {}", peer))
        }),
    )
}

/// Writes one JSON value per `\r\n`-terminated line to the write half of a
/// TCP stream.
pub(super) struct FrameWriter {
    writer: OwnedWriteHalf,
}

impl FrameWriter {
    pub(super) fn new(writer: OwnedWriteHalf) -> Self {
        Self { writer }
    }

    /// Serialize and send a single frame.
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other branch completes
    /// first, the frame may have been partially written and the connection
    /// is left in an undefined state.
    pub(super) async fn write<T: Serialize>(&mut self, frame: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(frame)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}
