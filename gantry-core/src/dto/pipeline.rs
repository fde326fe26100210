//! Pipeline DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /pipeline/run`
///
/// `models` restricts the run to a subset of the catalogue; omitted means
/// every model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPipeline {
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

/// Response of `POST /pipeline/cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled_runs: Vec<Uuid>,
}
