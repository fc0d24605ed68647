//! Connection-lifecycle-aware server core.
//!
//! This module owns everything above the HTTP wire layer: accepting
//! connections, tracking their lifecycle, routing requests to handlers, and
//! shutting the whole thing down gracefully.
//!
//! # Connection lifecycle
//!
//! Every connection's driver reports its transitions to the
//! [`ConnectionRegistry`]:
//!
//! ```text
//!        ┌─────────┐
//!        │   New   │ ← Accepted, nothing exchanged yet
//!        └────┬────┘
//!             │ first request bytes
//!             ▼
//!        ┌─────────┐  response sent (keep-alive)  ┌─────────┐
//!        │ Active  │ ───────────────────────────► │  Idle   │
//!        │         │ ◄─────────────────────────── │         │
//!        └────┬────┘     next request bytes       └────┬────┘
//!             │                                        │
//!             │ close / error / timeout                │ peer close, idle
//!             ▼                                        │ timeout, or drain
//!        ┌─────────┐                                   │
//!        │ Closed  │ ◄─────────────────────────────────┘
//!        └─────────┘
//! ```
//!
//! `Closed` is reported exactly once per connection, on every exit path.
//! The [`ShutdownCoordinator`] watches the registry: once triggered, the
//! accept loop stops, idle connections close, in-flight exchanges get the
//! grace period to finish, and whatever survives the deadline is
//! force-closed.

pub mod conn;
pub mod faults;
pub mod listener;
pub mod registry;
pub mod router;
pub mod shutdown;

pub use faults::PacketLossSimulator;
pub use listener::{Server, ServerError, ServerHandle};
pub use registry::{
    ConnectionId, ConnectionRegistry, ConnectionState, LifecycleObserver, LogObserver,
    TransitionEvent,
};
pub use router::Router;
pub use shutdown::{Phase, ShutdownCoordinator, ShutdownOutcome};
