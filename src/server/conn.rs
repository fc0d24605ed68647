//! Per-connection driver
//!
//! One driver task per accepted socket. The driver owns the stream, reports
//! every lifecycle transition to the registry, parses requests off a buffered
//! stream (so pipelined requests are served back-to-back), and runs the
//! dispatch pipeline: fault gate, Host check, route lookup, response write.
//! Keep-alive loops back for the next request; timeouts, errors, drain, and
//! forced closure all funnel into the single exit where `Closed` is reported
//! exactly once.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

use crate::config::ServerConfig;
use crate::http::parser::{self, parse_http_request, ParseError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::faults::PacketLossSimulator;
use crate::server::registry::{ConnectionId, ConnectionRegistry, ConnectionState};
use crate::server::router::Router;
use crate::server::shutdown::ShutdownCoordinator;

/// Read/write/idle deadlines, taken from [`ServerConfig`] at startup.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Deadline for reading one full request
    pub read: Duration,
    /// Deadline for writing one full response
    pub write: Duration,
    /// How long a keep-alive connection may sit between requests
    pub idle: Duration,
}

impl From<&ServerConfig> for Timeouts {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            read: cfg.read_timeout(),
            write: cfg.write_timeout(),
            idle: cfg.idle_timeout(),
        }
    }
}

/// Everything a driver needs besides its own socket. One per server,
/// cheap to clone per connection.
#[derive(Clone)]
pub struct ConnContext {
    pub router: Arc<Router>,
    pub registry: Arc<ConnectionRegistry>,
    pub coordinator: Arc<ShutdownCoordinator>,
    pub faults: Option<Arc<PacketLossSimulator>>,
    pub timeouts: Timeouts,
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
}

enum ReadOutcome {
    Request(Request),
    /// Peer closed the connection (or went away mid-request)
    PeerClosed,
    /// Drain started while the connection sat idle
    DrainIdle,
    /// Read or idle deadline expired
    TimedOut,
    /// Unparseable framing or oversized header block
    Malformed,
    /// Declared body length exceeds the configured cap
    BodyTooLarge,
}

pub struct ConnectionDriver {
    id: ConnectionId,
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
    ctx: ConnContext,
}

impl ConnectionDriver {
    pub fn new(id: ConnectionId, stream: TcpStream, peer: SocketAddr, ctx: ConnContext) -> Self {
        Self {
            id,
            stream,
            peer,
            buffer: Vec::with_capacity(4096),
            ctx,
        }
    }

    /// Drives the connection to completion.
    ///
    /// Reports `New` on entry and `Closed` exactly once on the way out, on
    /// every path. During the grace period cancellation is cooperative; once
    /// the coordinator fires force-close, the serve future is dropped and the
    /// socket goes down with it.
    pub async fn run(mut self) {
        let id = self.id;
        let registry = self.ctx.registry.clone();
        let coordinator = self.ctx.coordinator.clone();

        registry.on_transition(id, ConnectionState::New);

        let result = tokio::select! {
            res = self.serve() => res,
            _ = coordinator.force_closed() => {
                tracing::warn!(conn = %id, "Force-closed after grace period");
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(conn = %id, "Connection error: {}", e);
        }

        registry.on_transition(id, ConnectionState::Closed);
    }

    async fn serve(&mut self) -> anyhow::Result<()> {
        let mut first = true;

        loop {
            let outcome = self.next_request(!first).await?;
            first = false;

            let request = match outcome {
                ReadOutcome::Request(req) => req,
                ReadOutcome::PeerClosed => return Ok(()),
                ReadOutcome::DrainIdle => {
                    tracing::debug!(conn = %self.id, "Closing idle connection for drain");
                    return Ok(());
                }
                ReadOutcome::TimedOut => {
                    tracing::debug!(conn = %self.id, "Read deadline expired, closing");
                    return Ok(());
                }
                ReadOutcome::Malformed => {
                    // The stream cannot be resynchronized after bad framing.
                    self.reject(Response::bad_request("400 Bad Request")).await;
                    return Ok(());
                }
                ReadOutcome::BodyTooLarge => {
                    self.reject(Response::payload_too_large()).await;
                    return Ok(());
                }
            };

            tracing::info!(
                conn = %self.id,
                method = ?request.method,
                path = %request.path,
                peer = %self.peer,
                "Request"
            );

            // Fault gate sits in front of all request processing.
            if let Some(faults) = &self.ctx.faults {
                if !faults.should_admit() {
                    tracing::info!(
                        conn = %self.id,
                        path = %request.path,
                        "Dropping request: simulated packet loss"
                    );
                    self.ctx.registry.on_transition(self.id, ConnectionState::Idle);
                    continue;
                }
            }

            let keep_alive = request.keep_alive() && !self.ctx.coordinator.is_draining();

            // HTTP/1.1 requires a Host; refuse without dropping the connection.
            if request.host().is_none() {
                self.write_response(
                    Response::bad_request("400 Bad Request: missing Host header"),
                    !keep_alive,
                )
                .await?;

                if !keep_alive {
                    return Ok(());
                }
                self.ctx.registry.on_transition(self.id, ConnectionState::Idle);
                continue;
            }

            let response = match self.ctx.router.route(&request.path) {
                Some(handler) => handler(request).await,
                None => Response::not_found(),
            };

            // Drain may have begun while the handler ran.
            let keep_alive = keep_alive && !self.ctx.coordinator.is_draining();

            self.write_response(response, !keep_alive).await?;

            if !keep_alive {
                return Ok(());
            }
            self.ctx.registry.on_transition(self.id, ConnectionState::Idle);
        }
    }

    /// Reads one full request off the buffered stream.
    ///
    /// While a keep-alive connection waits for its next request, the idle
    /// deadline applies and the wait races the drain signal; once the first
    /// bytes arrive the connection goes `Active` and the read deadline takes
    /// over for the rest of the request.
    async fn next_request(&mut self, idle: bool) -> anyhow::Result<ReadOutcome> {
        let coordinator = self.ctx.coordinator.clone();

        let mut got_bytes = !self.buffer.is_empty();
        let mut deadline = Instant::now()
            + if idle && !got_bytes {
                self.ctx.timeouts.idle
            } else {
                self.ctx.timeouts.read
            };

        // A pipelined request may already sit in the buffer.
        if got_bytes {
            self.ctx.registry.on_transition(self.id, ConnectionState::Active);
        }

        loop {
            if exceeds_header_cap(&self.buffer, self.ctx.max_header_bytes) {
                tracing::warn!(
                    conn = %self.id,
                    limit = self.ctx.max_header_bytes,
                    "Header block exceeds limit"
                );
                return Ok(ReadOutcome::Malformed);
            }

            if exceeds_body_cap(&self.buffer, self.ctx.max_body_bytes) {
                tracing::warn!(
                    conn = %self.id,
                    limit = self.ctx.max_body_bytes,
                    "Declared body length exceeds limit"
                );
                return Ok(ReadOutcome::BodyTooLarge);
            }

            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.drain(..consumed);
                    return Ok(ReadOutcome::Request(request));
                }
                Err(ParseError::Incomplete) => {
                    // Need more data, fall through to read
                }
                Err(e) => {
                    tracing::debug!(conn = %self.id, error = ?e, "Rejecting malformed request");
                    return Ok(ReadOutcome::Malformed);
                }
            }

            let mut tmp = [0u8; 1024];
            tokio::select! {
                res = timeout_at(deadline, self.stream.read(&mut tmp)) => match res {
                    Ok(Ok(0)) => return Ok(ReadOutcome::PeerClosed),
                    Ok(Ok(n)) => {
                        self.buffer.extend_from_slice(&tmp[..n]);
                        if !got_bytes {
                            got_bytes = true;
                            self.ctx.registry.on_transition(self.id, ConnectionState::Active);
                            if idle {
                                deadline = Instant::now() + self.ctx.timeouts.read;
                            }
                        }
                    }
                    Ok(Err(e)) => return Err(e.into()),
                    Err(_) => return Ok(ReadOutcome::TimedOut),
                },
                _ = coordinator.triggered(), if idle && !got_bytes => {
                    return Ok(ReadOutcome::DrainIdle);
                }
            }
        }
    }

    async fn write_response(&mut self, mut response: Response, close_after: bool) -> anyhow::Result<()> {
        if close_after {
            response
                .headers
                .insert("Connection".to_string(), "close".to_string());
        }

        let writer = ResponseWriter::new(response);
        match timeout(self.ctx.timeouts.write, writer.write_to_stream(&mut self.stream)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("response write timed out")),
        }
    }

    /// Sends a terminal error response, shuts down the write half, and drains
    /// whatever the peer is still sending, bounded by the read deadline.
    /// Dropping the socket while unread bytes sit in the kernel buffer would
    /// turn the close into an RST that discards the queued response.
    async fn reject(&mut self, response: Response) {
        if let Err(e) = self.write_response(response, true).await {
            tracing::debug!(conn = %self.id, "Failed to send rejection: {}", e);
            return;
        }
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(conn = %self.id, "Failed to close write half: {}", e);
            return;
        }

        let deadline = Instant::now() + self.ctx.timeouts.read;
        let mut tmp = [0u8; 1024];
        loop {
            match timeout_at(deadline, self.stream.read(&mut tmp)).await {
                Ok(Ok(0)) | Ok(Err(_)) | Err(_) => return,
                Ok(Ok(_)) => {}
            }
        }
    }
}

fn exceeds_header_cap(buf: &[u8], cap: usize) -> bool {
    match parser::find_headers_end(buf) {
        Some(end) => end > cap,
        None => buf.len() > cap,
    }
}

fn exceeds_body_cap(buf: &[u8], cap: usize) -> bool {
    matches!(parser::declared_body_len(buf), Some(n) if n > cap)
}
