//! Gateway entry-point: loads configuration, wires adapters and serves HTTP.

mod server;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use paddock::inbound::http::health::HealthState;
use ortho_config::OrthoConfig;
use paddock::settings::GatewaySettings;
use server::{ServerConfig, build_gateway, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatewaySettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load configuration: {e}")))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let gateway = build_gateway(&settings).await?;
    let health_state = web::Data::new(HealthState::new().with_cache(gateway.cache.clone()));
    let server = create_server(
        health_state.clone(),
        ServerConfig::new(bind_addr, gateway.http_state),
    )?;
    info!(%bind_addr, "paddock gateway listening");

    let result = server.await;
    health_state.mark_unhealthy();
    if let Some(monitor) = gateway.health_monitor {
        monitor.abort();
    }
    result
}
