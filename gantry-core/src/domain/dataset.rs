//! Dataset domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the dataset-ingestion collaborator should read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSource {
    pub location: String,
}

impl DatasetSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Opaque handle to an ingested dataset, shared by every job of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetHandle {
    pub id: Uuid,
    pub location: String,
    /// Hex SHA-256 of the dataset contents
    pub fingerprint: String,
    pub size_bytes: u64,
    pub ingested_at: DateTime<Utc>,
}
