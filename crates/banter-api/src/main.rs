//! Banter scene dialogue orchestrator API server entry point.

use std::sync::Arc;

use banter_api::config::ApiConfig;
use banter_api::error::AppError;
use banter_api::routes;
use banter_api::state::AppState;
use banter_core::clock::SystemClock;
use banter_generation_client::{HttpCharacterRoster, HttpGenerationService};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Banter scene orchestrator");

    let config = ApiConfig::from_env()?;

    // One HTTP client for both collaborators; they live on the same server.
    let client = reqwest::Client::builder()
        .timeout(config.generation_timeout)
        .build()?;
    let generator =
        HttpGenerationService::with_client(client.clone(), config.generation_service_url.clone());
    let roster = HttpCharacterRoster::with_client(client, config.generation_service_url.clone());

    let app_state = AppState::new(
        Arc::new(roster),
        Arc::new(generator),
        Arc::new(SystemClock),
        config.scene,
    );

    // TODO: Replace CorsLayer::permissive() with the moderator UI origin once it is served separately.
    let app = routes::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    tracing::info!(
        generation_service_url = %config.generation_service_url,
        "Listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
