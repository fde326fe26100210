//! Pipeline API Handlers
//!
//! HTTP endpoints for running and cancelling the training pipeline.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use gantry_core::domain::notification::NotificationEvent;
use gantry_core::domain::report::PipelineReport;
use gantry_core::dto::notification::NotificationQuery;
use gantry_core::dto::pipeline::{CancelResponse, RunPipeline};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /pipeline/run
/// Run the pipeline over the catalogue, or over `{"models": [...]}`
///
/// An empty body runs every model. Always answers 200 with a report once
/// the dataset was ingested, however many models failed.
pub async fn run_pipeline(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<PipelineReport>> {
    let req: RunPipeline = if body.iter().all(u8::is_ascii_whitespace) {
        RunPipeline::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    tracing::info!(
        "Pipeline run requested ({})",
        req.models
            .as_ref()
            .map(|m| m.join(", "))
            .unwrap_or_else(|| "all models".to_string())
    );

    let report = state
        .controller
        .run_pipeline(
            &state.dataset_source,
            &state.catalogue,
            req.models.as_deref(),
        )
        .await?;

    Ok(Json(report))
}

/// POST /pipeline/cancel
/// Cancel every active pipeline run
pub async fn cancel_pipeline(State(state): State<AppState>) -> Json<CancelResponse> {
    let cancelled_runs = state.controller.cancel_all();
    tracing::info!("Cancelled {} pipeline run(s)", cancelled_runs.len());

    Json(CancelResponse { cancelled_runs })
}

/// GET /pipeline/notifications
/// Query the notification log by severity, model or run
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<NotificationEvent>>> {
    tracing::debug!("Listing notifications: {:?}", query);

    if matches!(query.limit, Some(limit) if limit <= 0) {
        return Err(ApiError::BadRequest("limit must be positive".to_string()));
    }

    let events = state.emitter.query(&query).await?;
    Ok(Json(events))
}
