use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::chunked::{ChunkedEncoder, WriteError};
use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

pub struct ResponseWriter {
    response: Response,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    /// Writes the full response to the stream.
    ///
    /// A `Full` body goes out right after the head. A `Chunked` body drains
    /// the handler's channel, one chunk per payload, until the sender is
    /// dropped, then writes the terminal chunk. The head is flushed before
    /// the first chunk so a paced handler's output is visible to the client
    /// as it is produced.
    pub async fn write_to_stream<W>(self, stream: &mut W) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        let head = serialize_head(&self.response);
        stream.write_all(&head).await?;

        match self.response.body {
            Body::Full(bytes) => {
                stream.write_all(&bytes).await?;
                stream.flush().await?;
            }
            Body::Chunked(mut receiver) => {
                stream.flush().await?;

                let mut encoder = ChunkedEncoder::new();
                while let Some(payload) = receiver.recv().await {
                    encoder.write_chunk(stream, &payload).await?;
                }
                encoder.finish(stream).await?;
            }
        }

        Ok(())
    }
}
