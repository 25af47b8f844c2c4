//! HTTP transport for the points service.

pub mod rest;


use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::service::PointsService;

pub use rest::router;

/// Bind the configured address. Port 0 picks an ephemeral port.
pub async fn bind(config: &ServerConfig) -> std::io::Result<TcpListener> {
    TcpListener::bind(config.addr()).await
}

/// Serve the REST API until `shutdown` resolves.
///
/// The actual bound address is always logged so an ephemeral port can be
/// discovered.
pub async fn serve<F>(
    listener: TcpListener,
    service: PointsService,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "points REST API listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("points REST API stopped");
    Ok(())
}
