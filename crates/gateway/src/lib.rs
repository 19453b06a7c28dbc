//! HTTP API gateway for Workroom.
//!
//! Exposes the assistant endpoints, a health check, and permissive CORS for
//! browser clients. Built on Axum.

pub mod api;
pub mod auth;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use workroom_assistant::Assistants;
use workroom_config::AppConfig;
use workroom_core::identity::UserDirectory;
use workroom_core::provider::Provider;
use workroom_providers::OpenAiCompatProvider;

pub use api::ApiError;
pub use auth::{AuthError, JwtAuthenticator};

/// Shared application state for the gateway. Immutable after startup.
pub struct GatewayState {
    pub assistants: Assistants,
    pub users: Arc<dyn UserDirectory>,
    pub auth: JwtAuthenticator,
}

pub type SharedState = Arc<GatewayState>;

/// Headers browser clients send with assistant requests.
const ALLOWED_HEADERS: [HeaderName; 4] = [
    header::AUTHORIZATION,
    HeaderName::from_static("x-client-info"),
    HeaderName::from_static("apikey"),
    header::CONTENT_TYPE,
];

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS)
}

/// Build the router with every gateway route.
pub fn build_router(state: SharedState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, stores and assistants once and shares them across
/// requests.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate_for_serving()?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config.provider)?);
    let stores = workroom_store::open(&config.database).await?;
    let assistants = Assistants::from_config(&config, provider, &stores);

    let state = Arc::new(GatewayState {
        assistants,
        users: stores.users.clone(),
        auth: JwtAuthenticator::from_config(&config.auth),
    });

    let app = build_router(state.clone(), config.gateway.body_limit_bytes);

    info!(
        addr = %addr,
        backend = %config.database.backend,
        assistants = ?state.assistants.names(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
