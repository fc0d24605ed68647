//! Tidegate - Lifecycle-Aware HTTP/1.1 Server Core
//!
//! Core library for connection tracking, graceful shutdown, and chunked
//! streaming responses.

pub mod config;
pub mod http;
pub mod server;
