//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod model;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post},
};
use gantry_core::domain::dataset::DatasetSource;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::catalogue::ModelCatalogue;
use crate::service::{ArtifactStore, NotificationEmitter, PipelineController};

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub catalogue: Arc<ModelCatalogue>,
    pub store: Arc<ArtifactStore>,
    pub emitter: NotificationEmitter,
    pub controller: PipelineController,
    /// Dataset every API-triggered run ingests
    pub dataset_source: DatasetSource,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/run", post(pipeline::run_pipeline))
        .route("/pipeline/cancel", post(pipeline::cancel_pipeline))
        .route("/pipeline/notifications", get(pipeline::list_notifications))
        // Model endpoints
        .route("/models", get(model::list_models))
        .route("/models/{name}/versions", get(model::list_versions))
        .route("/models/{name}/runs", get(model::list_runs))
        .route("/models/{name}/rollback", post(model::rollback_model))
        .route("/models/{name}/artifact", get(model::get_artifact))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
