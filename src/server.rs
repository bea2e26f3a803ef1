//! Liveness endpoint for hosts that expect an HTTP port to stay up.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{http::Method, http::StatusCode, Router};
use tokio::net::TcpListener;
use tracing::info;

async fn health(method: Method) -> (StatusCode, &'static str) {
    if method == Method::GET || method == Method::HEAD {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }
}

pub fn router() -> Router {
    Router::new().fallback(health)
}

/// Serve the liveness endpoint until the process exits.
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind liveness endpoint on {}", addr))?;
    info!("Keep-alive server running on port {}", port);
    serve_on(listener).await
}

async fn serve_on(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .context("Liveness server error")
}
