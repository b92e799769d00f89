//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::handlers::Handshake;
use aeon_common::{AppConfig, AppError, TelegramAuth};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: &AppConfig) -> Result<GatewayState, AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let db_config = aeon_db::DatabaseConfig::from(&config.database);
    let pool = aeon_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    let users = Arc::new(aeon_db::PgUserRepository::new(pool.clone()));
    let memberships = Arc::new(aeon_db::PgMembershipRepository::new(pool));

    let auth = TelegramAuth::new(&config.telegram.bot_token)?
        .with_max_age(config.telegram.auth_max_age_secs);
    let handshake = Handshake::new(auth, users, config.websocket.handshake_timeout());

    Ok(GatewayState::new(
        handshake,
        memberships,
        config.websocket.clone(),
    ))
}

/// Run the gateway server on an already bound listener
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), AppError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/ws", addr);
    }

    axum::serve(listener, app).await.map_err(AppError::Server)
}

/// Bind `addr` and run the gateway server
pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    serve(listener, app).await
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();

    // Create gateway state
    let state = create_gateway_state(&config).await?;

    // Build application
    let app = create_app(state);

    // Run server
    run_server(app, &addr).await
}
