//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 wire layer: parsing requests off a
//! byte buffer, representing requests and responses, and serializing
//! responses back to the client with either Content-Length or chunked
//! transfer coding.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation and accessors
//! - **`response`**: HTTP response representation with builder pattern
//! - **`chunked`**: Chunked transfer coding for streaming bodies
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! Connection lifecycle (accepting sockets, keep-alive, state tracking,
//! shutdown) lives in the [`server`](crate::server) module; this layer only
//! speaks the protocol.
//!
//! # Example
//!
//! ```
//! use tidegate::http::parser::parse_http_request;
//! use tidegate::http::response::Response;
//!
//! let raw = b"GET /status HTTP/1.1\r\nHost: localhost\r\n\r\n";
//! let (request, consumed) = parse_http_request(raw).unwrap();
//! assert_eq!(request.path, "/status");
//! assert_eq!(consumed, raw.len());
//!
//! let response = Response::ok("up");
//! assert_eq!(response.status.as_u16(), 200);
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod chunked;
pub mod writer;
