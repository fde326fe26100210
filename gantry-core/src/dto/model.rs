//! Model DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::artifact::{ArtifactStatus, ArtifactVersion};
use crate::domain::model::{Category, ScoreDirection};

/// Entry of `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub name: String,
    pub category: Category,
    pub score_direction: ScoreDirection,
    pub promoted: Option<VersionSummary>,
}

/// Entry of `GET /models/{name}/versions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub status: ArtifactStatus,
}

impl From<ArtifactVersion> for VersionSummary {
    fn from(version: ArtifactVersion) -> Self {
        VersionSummary {
            id: version.id,
            created_at: version.created_at,
            score: version.score,
            status: version.status,
        }
    }
}
