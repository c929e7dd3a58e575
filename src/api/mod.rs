pub mod routes;

use crate::config::Config;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

/// Serves the analytics API on 127.0.0.1 until Ctrl+C.
pub async fn run_server(config: Arc<Config>) -> Result<()> {
    let listener = bind_local(config.api_port).await?;

    serve_until(config, listener, async {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
        }
    })
    .await
}

pub async fn bind_local(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))
}

/// Runs the router on `listener`. In-flight requests finish once `shutdown`
/// resolves.
pub async fn serve_until<F>(config: Arc<Config>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .context("API listener has no local address")?;
    let app = routes::router(routes::ApiState { config });

    info!(address = %addr, "PomoStats API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server failed")?;

    info!(address = %addr, "PomoStats API server stopped");
    Ok(())
}
