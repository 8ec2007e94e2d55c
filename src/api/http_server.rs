// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server wiring

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::predict::predict_handler;
use crate::config::ServiceConfig;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{load_model, ModelState};

/// Fixed welcome message for the root endpoint
pub const WELCOME_MESSAGE: &str = "Welcome to the helmet detection AI server!";

/// Shared per-request context
///
/// The model state is read-only after startup and shared across all
/// concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelState>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(model: ModelState, config: ServiceConfig) -> Self {
        Self {
            model: Arc::new(model),
            config: Arc::new(config),
        }
    }
}

/// Build the service router
pub fn router(state: AppState) -> Router {
    Router::new()
        // Connectivity check
        .route("/", get(root_handler))
        // Inference endpoint
        .route("/predict", post(predict_handler))
        // Multipart bodies carry some overhead on top of the image itself
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE * 2))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

/// Load the model and serve until shutdown
pub async fn start_server(config: ServiceConfig) -> anyhow::Result<()> {
    let model = load_model(&config).await;
    if !model.is_available() {
        tracing::warn!("Serving in degraded mode: /predict will return 503");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let state = AppState::new(model, config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
