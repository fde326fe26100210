//! Model API Handlers
//!
//! Version history, training runs, manual rollback and artifact download.

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use gantry_core::domain::artifact::ArtifactVersion;
use gantry_core::domain::notification::Severity;
use gantry_core::domain::run::TrainingRun;
use gantry_core::dto::model::{ModelSummary, VersionSummary};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::repository::run_repository;

fn ensure_known(state: &AppState, name: &str) -> ApiResult<()> {
    if state.catalogue.get(name).is_none() {
        return Err(ApiError::NotFound(format!("Model {} not found", name)));
    }
    Ok(())
}

/// GET /models
/// List catalogue models with their promoted versions
pub async fn list_models(State(state): State<AppState>) -> ApiResult<Json<Vec<ModelSummary>>> {
    tracing::debug!("Listing models");

    let mut models = Vec::with_capacity(state.catalogue.len());
    for entry in state.catalogue.entries() {
        let definition = &entry.definition;
        // A broken journal only hides that model's promoted version
        let promoted = match state.store.get_promoted(&definition.name).await {
            Ok(promoted) => promoted,
            Err(e) => {
                tracing::error!("Cannot read promoted version of {}: {}", definition.name, e);
                None
            }
        };
        models.push(ModelSummary {
            name: definition.name.clone(),
            category: definition.category,
            score_direction: definition.score_direction,
            promoted: promoted.map(VersionSummary::from),
        });
    }

    Ok(Json(models))
}

/// GET /models/{name}/versions
/// Version history of a model, oldest first
pub async fn list_versions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<VersionSummary>>> {
    tracing::debug!("Listing versions of {}", name);
    ensure_known(&state, &name)?;

    let history = state.store.history(&name).await?;
    Ok(Json(
        history
            .into_versions()
            .into_iter()
            .map(VersionSummary::from)
            .collect(),
    ))
}

/// GET /models/{name}/runs
/// Training runs of a model, oldest first
pub async fn list_runs(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<TrainingRun>>> {
    tracing::debug!("Listing training runs of {}", name);
    ensure_known(&state, &name)?;

    let runs = run_repository::find_by_model(&state.pool, &name).await?;
    Ok(Json(runs))
}

/// POST /models/{name}/rollback
/// Reverse the most recent cutover of a model
pub async fn rollback_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ArtifactVersion>> {
    tracing::info!("Manual rollback requested for {}", name);
    ensure_known(&state, &name)?;

    let restored = state.store.rollback(&name).await?;

    state
        .emitter
        .emit(
            None,
            &name,
            Severity::Warning,
            format!(
                "manual rollback: version {} (score {}) is back in service",
                restored.id, restored.score
            ),
        )
        .await;

    Ok(Json(restored))
}

/// GET /models/{name}/artifact
/// Download the blob of the promoted version
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    tracing::debug!("Fetching promoted artifact of {}", name);
    ensure_known(&state, &name)?;

    let promoted = state
        .store
        .get_promoted(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Model {} has no promoted version", name)))?;

    let bytes = state.store.read_blob(promoted.id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::HeaderName::from_static("x-gantry-version"),
                promoted.id.to_string(),
            ),
        ],
        bytes,
    ))
}
