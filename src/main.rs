use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use tidegate::config::Config;
use tidegate::http::request::Request;
use tidegate::http::response::{Response, ResponseBuilder, StatusCode};
use tidegate::server::{ConnectionRegistry, LogObserver, Router, Server};

/// Welcome page. Echoes `Connection: keep-alive` back when the client asks
/// for it; the Host requirement is enforced by the server before dispatch.
async fn root(req: Request) -> Response {
    let mut builder = ResponseBuilder::new(StatusCode::Ok).header("Content-Type", "text/plain");

    if let Some(conn) = req.header("Connection") {
        if conn.eq_ignore_ascii_case("keep-alive") {
            builder = builder.header("Connection", "keep-alive");
        }
    }

    builder
        .body(b"Welcome to tidegate, an HTTP/1.1 server.\n".to_vec())
        .build()
}

/// Streams three chunks, paced on the handler's own task. The pacing makes
/// the chunk boundaries visible to clients reading incrementally.
async fn chunked(_req: Request) -> Response {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        for i in 1..=3 {
            let payload = Bytes::from(format!("Chunk {i} of 3\n"));
            if tx.send(payload).await.is_err() {
                // Client went away; stop producing.
                return;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    Response::chunked(rx)
}

/// Simulates request processing whose duration depends on the client's
/// `?priority=` choice.
async fn delay(req: Request) -> Response {
    let priority = req
        .query_param("priority")
        .unwrap_or_else(|| "normal".to_string());

    let wait = match priority.as_str() {
        "high" => Duration::from_millis(100),
        "low" => Duration::from_secs(2),
        _ => Duration::from_millis(500),
    };
    tokio::time::sleep(wait).await;

    Response::ok(format!(
        "Processed with {priority} priority after {}ms\n",
        wait.as_millis()
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let mut router = Router::new();
    router.add("/", root);
    router.add("/chunked", chunked);
    router.add("/delay", delay);

    let registry = Arc::new(ConnectionRegistry::new());
    registry.subscribe(Arc::new(LogObserver));

    let server = Server::bind(&cfg, router, registry).await?;
    let handle = server.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            handle.shutdown();
        }
    });

    let outcome = server.run().await;
    tracing::info!(outcome = ?outcome, "Server exited");

    Ok(())
}
