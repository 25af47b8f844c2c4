//! points-ledger: payer points service
//!
//! Serves the points REST API over an in-memory ledger. State lives for the
//! life of the process.
//!
//! ## Configuration
//! - First argument: path to a YAML config file (optional)
//! - POINTS_CONFIG: path to a YAML config file (optional)
//! - POINTS__SERVER__HOST / POINTS__SERVER__PORT: bind address (default 0.0.0.0:8080)
//! - POINTS__LEDGER__SPEND_POLICY: `partial` (default) or `all_or_nothing`
//! - POINTS_LOG: tracing filter (default: info)

use tracing::info;

use points_ledger::config::Config;
use points_ledger::service::PointsService;
use points_ledger::transport;
use points_ledger::utils::bootstrap::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    info!(
        address = %config.server.addr(),
        spend_policy = ?config.ledger.spend_policy,
        "points-ledger starting"
    );

    let service = PointsService::new(config.ledger.spend_policy);
    let listener = transport::bind(&config.server).await?;
    transport::serve(listener, service, shutdown_signal()).await?;

    Ok(())
}
