//! Training run domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of one Job Runner invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Record of one training attempt for one model
///
/// Owned by the orchestrator; terminal once `outcome` is set and never
/// retried within the same pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRun {
    pub id: Uuid,
    /// Pipeline execution this run belongs to
    pub pipeline_run_id: Uuid,
    pub model_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub error_detail: Option<String>,
}

/// Per-model state within a single pipeline run
///
/// `Pending -> Running -> {Promoted | RolledBack | Failed | TimedOut}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Pending,
    Running,
    Promoted,
    RolledBack,
    Failed,
    TimedOut,
}

impl ModelState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ModelState::Pending | ModelState::Running)
    }

    /// Whether the model counts as a success in the pipeline report
    ///
    /// A rejected candidate still means the job ran and the store stayed
    /// consistent, so it is not a failure.
    pub fn is_success(self) -> bool {
        matches!(self, ModelState::Promoted | ModelState::RolledBack)
    }
}
