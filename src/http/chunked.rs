use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Errors produced while writing a response body to the peer.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The underlying stream failed mid-write.
    #[error("stream write failed: {0}")]
    Stream(#[from] std::io::Error),
    /// The body was already terminated; no further writes are possible.
    #[error("chunked body already finished")]
    StreamClosed,
}

/// Encoder for HTTP/1.1 chunked transfer coding.
///
/// Frames each payload as `<size-hex>\r\n<payload>\r\n` and terminates the
/// body with the zero-length chunk `0\r\n\r\n`. The encoder holds no stream
/// of its own; callers lend it the output stream per call, so the connection
/// keeps ownership of its socket between chunks.
///
/// # Example
///
/// ```
/// # use tidegate::http::chunked::ChunkedEncoder;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut out: Vec<u8> = Vec::new();
/// let mut encoder = ChunkedEncoder::new();
/// encoder.write_chunk(&mut out, b"hello").await.unwrap();
/// encoder.finish(&mut out).await.unwrap();
/// assert_eq!(out, b"5\r\nhello\r\n0\r\n\r\n");
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkedEncoder {
    finished: bool,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { finished: false }
    }

    /// Writes one payload as a single chunk and flushes it.
    ///
    /// Each chunk is flushed immediately so paced bodies reach the client
    /// between handler delays rather than sitting in a buffer. An empty
    /// payload is skipped: on the wire it would be indistinguishable from
    /// the terminal marker.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::StreamClosed`] if [`finish`](Self::finish) was
    /// already called, or [`WriteError::Stream`] if the socket write fails.
    pub async fn write_chunk<W>(&mut self, stream: &mut W, payload: &[u8]) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.finished {
            return Err(WriteError::StreamClosed);
        }
        if payload.is_empty() {
            return Ok(());
        }

        let mut frame = BytesMut::with_capacity(payload.len() + 16);
        frame.extend_from_slice(format!("{:x}\r\n", payload.len()).as_bytes());
        frame.extend_from_slice(payload);
        frame.extend_from_slice(b"\r\n");

        stream.write_all(&frame).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Terminates the body with the zero-length chunk.
    ///
    /// After this returns, the encoder refuses further writes. Calling
    /// `finish` twice is an error for the same reason.
    pub async fn finish<W>(&mut self, stream: &mut W) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        if self.finished {
            return Err(WriteError::StreamClosed);
        }
        self.finished = true;

        stream.write_all(b"0\r\n\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}
