//! Listener and server composition
//!
//! `Server::bind` composes the router, registry, coordinator, and optional
//! fault gate; `run` drives the accept loop until draining starts, then
//! waits out the drain and reports the outcome.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::server::conn::{ConnContext, ConnectionDriver, Timeouts};
use crate::server::faults::PacketLossSimulator;
use crate::server::registry::{ConnectionId, ConnectionRegistry};
use crate::server::router::Router;
use crate::server::shutdown::{ShutdownCoordinator, ShutdownOutcome};

/// Fatal startup errors. Everything after a successful bind is recovered
/// per-connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Cheap handle for triggering shutdown from outside the server task.
#[derive(Clone)]
pub struct ServerHandle {
    coordinator: Arc<ShutdownCoordinator>,
}

impl ServerHandle {
    /// Starts draining. Idempotent; returns whether this call started it.
    pub fn shutdown(&self) -> bool {
        self.coordinator.trigger()
    }
}

pub struct Server {
    listener: TcpListener,
    ctx: ConnContext,
    grace: Duration,
}

impl Server {
    /// Binds the listener and composes the server.
    ///
    /// The registry is supplied by the caller so tests and diagnostics can
    /// keep their own reference to it; the coordinator is created here and
    /// reachable through [`Server::handle`].
    pub async fn bind(
        config: &Config,
        router: Router,
        registry: Arc<ConnectionRegistry>,
    ) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let addr = &config.server.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Listening on {}", addr);

        let coordinator = Arc::new(ShutdownCoordinator::new(registry.clone()));

        let faults = if config.faults.enabled {
            let gate = match config.faults.seed {
                Some(seed) => {
                    PacketLossSimulator::with_seed(config.faults.drop_probability, seed)
                }
                None => PacketLossSimulator::new(config.faults.drop_probability),
            };
            info!(
                probability = gate.drop_probability(),
                "Packet-loss gate enabled"
            );
            Some(Arc::new(gate))
        } else {
            None
        };

        let ctx = ConnContext {
            router: Arc::new(router),
            registry,
            coordinator,
            faults,
            timeouts: Timeouts::from(&config.server),
            max_header_bytes: config.server.max_header_bytes,
            max_body_bytes: config.server.max_body_bytes,
        };

        Ok(Self {
            listener,
            ctx,
            grace: config.shutdown.grace(),
        })
    }

    /// Address the listener actually bound. Useful with port 0 in tests.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            coordinator: self.ctx.coordinator.clone(),
        }
    }

    /// Accepts connections until draining starts, then waits out the drain.
    ///
    /// Each accepted socket gets a fresh [`ConnectionId`] and a spawned
    /// driver task. Accept errors are logged and the loop keeps going. The
    /// listener is dropped the moment draining starts, so new connection
    /// attempts are refused while existing ones finish. After a timed-out
    /// drain, `run` briefly waits for the forced drivers to report `Closed`
    /// so the registry is consistent when it returns.
    pub async fn run(self) -> ShutdownOutcome {
        let Self {
            listener,
            ctx,
            grace,
        } = self;
        let coordinator = ctx.coordinator.clone();
        let registry = ctx.registry.clone();
        let mut next_id: u64 = 1;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            let id = ConnectionId(next_id);
                            next_id += 1;
                            info!(conn = %id, peer = %peer, "Accepted connection");

                            let driver = ConnectionDriver::new(id, socket, peer, ctx.clone());
                            tokio::spawn(driver.run());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = coordinator.triggered() => {
                    break;
                }
            }
        }

        // Refuse new connections from here on.
        drop(listener);

        let outcome = coordinator.await_shutdown(grace).await;

        if let ShutdownOutcome::TimedOut { .. } = &outcome {
            let _ = tokio::time::timeout(Duration::from_secs(1), registry.drained()).await;
        }

        outcome
    }
}
