//! Async transport helpers shared by both roles.
//!
//! The framing itself lives in [`frame`](crate::frame); this module binds it
//! to any bidirectional byte stream. Generic over `AsyncRead`/`AsyncWrite` so
//! the same plumbing serves TCP today and could serve another stream
//! transport unchanged.

use crate::error::SyncError;
use crate::frame::{self, FrameDecoder};
use crate::message::WireMessage;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

const READ_CHUNK: usize = 4096;

/// Read the next complete message, driving the decoder with whatever chunk
/// sizes the stream delivers. `Ok(None)` means the peer closed cleanly.
pub async fn read_message<R: AsyncRead + Unpin>(
    read: &mut R,
    decoder: &mut FrameDecoder,
) -> Result<Option<WireMessage>, SyncError> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        if let Some(payload) = decoder.next_frame()? {
            return Ok(Some(serde_json::from_slice(&payload)?));
        }
        let n = read.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        decoder.extend(&chunk[..n]);
    }
}

/// Serialize and frame one message onto the stream.
pub async fn write_message<W: AsyncWrite + Unpin>(
    write: &mut W,
    msg: &WireMessage,
) -> Result<(), SyncError> {
    let payload = serde_json::to_vec(msg)?;
    let framed = frame::encode(&payload)?;
    write.write_all(&framed).await?;
    Ok(())
}

/// Drain a channel of outbound messages onto the stream. Runs as its own
/// task so callers enqueue without blocking; ends when the channel closes or
/// the stream dies (the read side notices the latter and tears down).
pub async fn write_loop<W: AsyncWrite + Unpin>(
    mut write: W,
    mut outbound: mpsc::UnboundedReceiver<WireMessage>,
) {
    while let Some(msg) = outbound.recv().await {
        if let Err(e) = write_message(&mut write, &msg).await {
            tracing::debug!(error = %e, "outbound write failed");
            break;
        }
    }
}
