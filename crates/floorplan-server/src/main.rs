//! Floor-plan REST server
//!
//! Serves projects, their drawings and drawing elements as JSON under `/api`.
//! Callers are identified by a header set by an authenticating gateway
//! (`x-user-id` unless `FLOORPLAN_USER_HEADER` says otherwise).

mod config;
mod db;
mod error;
mod identity;
mod routes;
mod state;

use config::ServerConfig;
use state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floorplan_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let app = routes::router(AppState::new(&config.user_header));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Floor-plan server listening on {}", config.addr);
    info!("Identity header: {}", config.user_header);

    axum::serve(listener, app).await?;
    Ok(())
}
