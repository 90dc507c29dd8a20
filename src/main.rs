//! Smart Traffic Light Server
//!
//! Dual-model dashboard: a CNN for emergency vehicle detection and an
//! XGBoost-style regressor for adaptive green signal duration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SMART TRAFFIC                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │ Dashboard │  │ Image Intake  │  │  Traffic Stats Form │ │
//! │  │  (Axum)   │  │ (128x128 RGB) │  │  (5-field record)   │ │
//! │  └─────┬─────┘  └───────┬───────┘  └──────────┬──────────┘ │
//! │        └────────────────┼─────────────────────┘            │
//! │                         ▼                                   │
//! │        ┌─────────────────────────────────┐                 │
//! │        │ Model Registry (ONNX | random)  │                 │
//! │        └─────────────────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod inference;
mod intake;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(config.json_logs);
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Smart Traffic Server starting...");
    tracing::info!("Model fallback policy: {}", config.fallback_policy);
    if config.is_production() && config.fallback_policy == inference::FallbackPolicy::Random {
        tracing::warn!("Production environment with random fallback enabled");
    }

    // Load models once, shared by every request
    let models = inference::ModelRegistry::load(
        &config.cnn_model_path,
        &config.xgb_model_path,
        config.fallback_policy,
    )
    .context("Failed to load models")?;

    for status in models.status() {
        tracing::info!("Model {}: {:?} ({})", status.name, status.method, status.artifact_path);
    }

    // Build application state
    let state = AppState {
        config: config.clone(),
        models: Arc::new(models),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚦 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "smart_traffic=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub models: Arc<inference::ModelRegistry>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;

    let api_routes = Router::new()
        .route("/api/v1/detect", post(handlers::detection::detect))
        .route("/api/v1/duration", post(handlers::duration::predict))
        .route("/api/v1/predict", post(handlers::predict::submit))
        .route("/api/v1/models", get(handlers::models::status))
        .route("/api/v1/models/reload", post(handlers::models::reload));

    Router::new()
        .route("/", get(handlers::dashboard::index))
        .route("/health", get(handlers::health::check))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
