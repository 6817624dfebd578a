use crate::app_config::AppConfig;
use crate::auth::IdentityVerifier;
use crate::ingest::Pipeline;
use crate::transport::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod app_config;
mod auth;
mod domain;
mod ingest;
mod store;
mod transport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    tracing_subscriber::fmt().with_max_level(config.core().log_level()).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("✅  Loaded configuration");

    if config.auth().jwt_secret().is_empty() {
        warn!("⚠️ auth.jwt_secret is empty, tokens signed with an empty key will be accepted");
    }

    let store = store::connect(config.store()).await?;
    info!("✅  Connected to the store");

    let state = AppState::new(IdentityVerifier::new(config.auth().jwt_secret()), Pipeline::new(store.clone(), &config));
    let app = transport::router(state, config.server().max_body_bytes());

    let listener = TcpListener::bind(("0.0.0.0", config.server().port())).await?;
    info!("🔥 {} is listening on {}", env!("CARGO_PKG_NAME"), listener.local_addr()?);

    transport::serve(listener, app).await?;

    drop(store);
    info!("👋 {} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
