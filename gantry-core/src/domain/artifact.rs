//! Artifact version domain types
//!
//! Metadata about trained artifacts is append-only: a version record is
//! written once, and every status change is a separate journal event. The
//! current status of each version is obtained by replaying those events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle status of an artifact version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactStatus {
    /// Freshly staged, not yet judged
    Candidate,
    /// Currently in service
    Promoted,
    /// Was in service until a later cutover displaced it
    Superseded,
    /// Rejected by the quality gate or reverted by a rollback
    RolledBack,
}

impl ArtifactStatus {
    /// Whether the journal accepts a transition from `self` to `next`
    pub fn can_transition_to(self, next: ArtifactStatus) -> bool {
        use ArtifactStatus::*;
        matches!(
            (self, next),
            (Candidate, Promoted)
                | (Candidate, RolledBack)
                | (Promoted, Superseded)
                | (Promoted, RolledBack)
                | (Superseded, Promoted)
        )
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactStatus::Candidate => write!(f, "Candidate"),
            ArtifactStatus::Promoted => write!(f, "Promoted"),
            ArtifactStatus::Superseded => write!(f, "Superseded"),
            ArtifactStatus::RolledBack => write!(f, "RolledBack"),
        }
    }
}

/// A trained artifact together with its current status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactVersion {
    pub id: Uuid,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    /// Opaque handle understood by the blob storage
    pub blob_location: String,
    pub blob_sha256: String,
    pub status: ArtifactStatus,
}

/// Immutable metadata written once when a candidate is staged
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub id: Uuid,
    pub model_name: String,
    pub created_at: DateTime<Utc>,
    pub score: f64,
    pub blob_location: String,
    pub blob_sha256: String,
}

/// One entry of the status journal
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub seq: i64,
    pub version_id: Uuid,
    pub status: ArtifactStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Journal inconsistencies detected while replaying a model's history
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("status event {seq} references unknown version {version_id}")]
    UnknownVersion { seq: i64, version_id: Uuid },

    #[error("model {model} has {count} promoted versions")]
    MultiplePromoted { model: String, count: usize },
}

/// Chronological version history of one model, rebuilt from the journal
#[derive(Debug, Clone, Default)]
pub struct VersionHistory {
    model_name: String,
    versions: Vec<ArtifactVersion>,
    /// Versions displaced by cutovers, most recent last
    superseded: Vec<Uuid>,
}

impl VersionHistory {
    /// Rebuilds a history from version records (in insertion order) and
    /// status events (in journal order).
    pub fn replay(
        model_name: impl Into<String>,
        records: Vec<ArtifactRecord>,
        events: Vec<StatusEvent>,
    ) -> Result<Self, HistoryError> {
        let model_name = model_name.into();

        let index: HashMap<Uuid, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();

        let mut versions: Vec<ArtifactVersion> = records
            .into_iter()
            .map(|r| ArtifactVersion {
                id: r.id,
                model_name: r.model_name,
                created_at: r.created_at,
                score: r.score,
                blob_location: r.blob_location,
                blob_sha256: r.blob_sha256,
                status: ArtifactStatus::Candidate,
            })
            .collect();

        let mut superseded = Vec::new();

        for event in events {
            let idx = *index
                .get(&event.version_id)
                .ok_or(HistoryError::UnknownVersion {
                    seq: event.seq,
                    version_id: event.version_id,
                })?;

            versions[idx].status = event.status;

            superseded.retain(|id| *id != event.version_id);
            if event.status == ArtifactStatus::Superseded {
                superseded.push(event.version_id);
            }
        }

        let promoted = versions
            .iter()
            .filter(|v| v.status == ArtifactStatus::Promoted)
            .count();
        if promoted > 1 {
            return Err(HistoryError::MultiplePromoted {
                model: model_name,
                count: promoted,
            });
        }

        Ok(Self {
            model_name,
            versions,
            superseded,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// All versions, oldest first
    pub fn versions(&self) -> &[ArtifactVersion] {
        &self.versions
    }

    pub fn into_versions(self) -> Vec<ArtifactVersion> {
        self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ArtifactVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// The version currently in service
    pub fn promoted(&self) -> Option<&ArtifactVersion> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.status == ArtifactStatus::Promoted)
    }

    /// The version that was in service immediately before the most recent
    /// cutover, i.e. the one a rollback would restore.
    pub fn previous_promoted(&self) -> Option<&ArtifactVersion> {
        self.superseded.last().and_then(|id| self.get(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, score: f64) -> ArtifactRecord {
        ArtifactRecord {
            id: Uuid::new_v4(),
            model_name: model.to_string(),
            created_at: Utc::now(),
            score,
            blob_location: format!("{}/blob", model),
            blob_sha256: String::new(),
        }
    }

    struct Journal {
        events: Vec<StatusEvent>,
    }

    impl Journal {
        fn new() -> Self {
            Self { events: Vec::new() }
        }

        fn push(&mut self, id: Uuid, status: ArtifactStatus) {
            self.events.push(StatusEvent {
                seq: self.events.len() as i64 + 1,
                version_id: id,
                status,
                recorded_at: Utc::now(),
            });
        }
    }

    #[test]
    fn test_transitions() {
        use ArtifactStatus::*;
        assert!(Candidate.can_transition_to(Promoted));
        assert!(Candidate.can_transition_to(RolledBack));
        assert!(Promoted.can_transition_to(Superseded));
        assert!(Superseded.can_transition_to(Promoted));
        assert!(!RolledBack.can_transition_to(Promoted));
        assert!(!Candidate.can_transition_to(Superseded));
        assert!(!Promoted.can_transition_to(Candidate));
    }

    #[test]
    fn test_replay_empty() {
        let history = VersionHistory::replay("m", vec![], vec![]).unwrap();
        assert!(history.is_empty());
        assert!(history.promoted().is_none());
        assert!(history.previous_promoted().is_none());
    }

    #[test]
    fn test_unjudged_record_is_candidate() {
        let r = record("m", 0.5);
        let history = VersionHistory::replay("m", vec![r.clone()], vec![]).unwrap();
        assert_eq!(history.get(r.id).unwrap().status, ArtifactStatus::Candidate);
        assert!(history.promoted().is_none());
    }

    #[test]
    fn test_replay_cutovers_and_rollback() {
        let v1 = record("m", 0.80);
        let v2 = record("m", 0.85);
        let v3 = record("m", 0.90);
        let mut j = Journal::new();

        j.push(v1.id, ArtifactStatus::Promoted);
        j.push(v1.id, ArtifactStatus::Superseded);
        j.push(v2.id, ArtifactStatus::Promoted);
        j.push(v2.id, ArtifactStatus::Superseded);
        j.push(v3.id, ArtifactStatus::Promoted);

        let history = VersionHistory::replay(
            "m",
            vec![v1.clone(), v2.clone(), v3.clone()],
            j.events.clone(),
        )
        .unwrap();
        assert_eq!(history.promoted().unwrap().id, v3.id);
        assert_eq!(history.previous_promoted().unwrap().id, v2.id);

        // Manual rollback: v3 reverted, v2 restored
        j.push(v3.id, ArtifactStatus::RolledBack);
        j.push(v2.id, ArtifactStatus::Promoted);

        let history =
            VersionHistory::replay("m", vec![v1.clone(), v2.clone(), v3.clone()], j.events)
                .unwrap();
        assert_eq!(history.promoted().unwrap().id, v2.id);
        assert_eq!(history.previous_promoted().unwrap().id, v1.id);
        assert_eq!(history.get(v3.id).unwrap().status, ArtifactStatus::RolledBack);
    }

    #[test]
    fn test_replay_rejects_unknown_version() {
        let v1 = record("m", 1.0);
        let mut j = Journal::new();
        j.push(Uuid::new_v4(), ArtifactStatus::Promoted);

        let err = VersionHistory::replay("m", vec![v1], j.events).unwrap_err();
        assert!(matches!(err, HistoryError::UnknownVersion { seq: 1, .. }));
    }

    #[test]
    fn test_replay_detects_double_promotion() {
        let v1 = record("m", 1.0);
        let v2 = record("m", 2.0);
        let mut j = Journal::new();
        j.push(v1.id, ArtifactStatus::Promoted);
        j.push(v2.id, ArtifactStatus::Promoted);

        let err = VersionHistory::replay("m", vec![v1, v2], j.events).unwrap_err();
        assert_eq!(
            err,
            HistoryError::MultiplePromoted {
                model: "m".to_string(),
                count: 2
            }
        );
    }
}
