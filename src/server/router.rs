//! Route table
//!
//! Maps request paths to async handlers with rooted-subtree rules: a pattern
//! ending in `/` matches every path under it, any other pattern matches
//! exactly, and the longest matching pattern wins. `/` is therefore the
//! catch-all.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;

/// Boxed async handler: one request in, one response out.
pub type Handler =
    Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// Route table consulted once per dispatched request.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Registers a handler for a pattern.
    ///
    /// Registering the same pattern twice replaces the earlier handler.
    ///
    /// # Example
    ///
    /// ```
    /// # use tidegate::server::router::Router;
    /// # use tidegate::http::response::Response;
    /// let mut router = Router::new();
    /// router.add("/status", |_req| async { Response::ok("up") });
    /// assert!(router.route("/status").is_some());
    /// assert!(router.route("/other").is_none());
    /// ```
    pub fn add<F, Fut>(&mut self, pattern: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)));
        self.routes.insert(pattern.into(), handler);
    }

    /// Finds the handler for a path.
    ///
    /// An exact match wins outright; otherwise the longest registered
    /// trailing-slash pattern that prefixes the path is chosen. `None` means
    /// the caller should answer 404.
    pub fn route(&self, path: &str) -> Option<Handler> {
        if let Some(handler) = self.routes.get(path) {
            return Some(handler.clone());
        }

        self.routes
            .iter()
            .filter(|(pattern, _)| pattern.ends_with('/') && path.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, handler)| handler.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
