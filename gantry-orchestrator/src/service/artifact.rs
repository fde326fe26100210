//! Artifact Store
//!
//! Durable, versioned storage for trained artifacts. Blobs live on disk under
//! `<blob_dir>/<model>/<version>.bin`; metadata is the insert-only version
//! table plus the append-only status journal.
//!
//! All operations touching one model name are serialized through a per-model
//! lock. Different models proceed in parallel.

use gantry_core::domain::artifact::{
    ArtifactRecord, ArtifactStatus, ArtifactVersion, HistoryError, VersionHistory,
};
use gantry_core::gate::Decision;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::repository::artifact_repository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("artifact version {0} not found")]
    VersionNotFound(Uuid),

    #[error("version {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: ArtifactStatus,
        to: ArtifactStatus,
    },

    #[error("model {0} has no previous version to roll back to")]
    NoPreviousVersion(String),

    #[error("corrupt artifact metadata: {0}")]
    Corrupt(String),
}

impl From<HistoryError> for StoreError {
    fn from(err: HistoryError) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// What `settle` did with a candidate
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The candidate is now in service
    Promoted {
        version: ArtifactVersion,
        previous: Option<ArtifactVersion>,
    },
    /// The candidate was rolled back; `kept` is still in service
    Rejected {
        candidate: ArtifactVersion,
        kept: Option<ArtifactVersion>,
    },
}

pub struct ArtifactStore {
    pool: SqlitePool,
    blob_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(pool: SqlitePool, blob_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            blob_dir: blob_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_model(&self, model_name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(model_name.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn load_history(&self, model_name: &str) -> Result<VersionHistory, StoreError> {
        let records = artifact_repository::find_records(&self.pool, model_name).await?;
        let events = artifact_repository::find_events(&self.pool, model_name).await?;
        Ok(VersionHistory::replay(model_name, records, events)?)
    }

    /// Full version history of a model, oldest first
    pub async fn history(&self, model_name: &str) -> Result<VersionHistory, StoreError> {
        let _guard = self.lock_model(model_name).await;
        self.load_history(model_name).await
    }

    /// The version currently in service, if the model was ever promoted
    pub async fn get_promoted(
        &self,
        model_name: &str,
    ) -> Result<Option<ArtifactVersion>, StoreError> {
        Ok(self.history(model_name).await?.promoted().cloned())
    }

    pub async fn get_version(&self, version_id: Uuid) -> Result<ArtifactVersion, StoreError> {
        let model_name = artifact_repository::find_model_name(&self.pool, version_id)
            .await?
            .ok_or(StoreError::VersionNotFound(version_id))?;

        self.history(&model_name)
            .await?
            .get(version_id)
            .cloned()
            .ok_or(StoreError::VersionNotFound(version_id))
    }

    /// Persist a new Candidate without touching the promoted version.
    ///
    /// The blob is written first; the metadata transaction is the commit
    /// point, so a failure at any step leaves no visible version behind.
    pub async fn stage_candidate(
        &self,
        model_name: &str,
        blob: &[u8],
        score: f64,
    ) -> Result<ArtifactVersion, StoreError> {
        let _guard = self.lock_model(model_name).await;

        let id = Uuid::new_v4();
        let blob_location = format!("{}/{}.bin", model_name, id);
        self.write_blob(&blob_location, blob).await?;

        let record = ArtifactRecord {
            id,
            model_name: model_name.to_string(),
            created_at: chrono::Utc::now(),
            score,
            blob_location,
            blob_sha256: sha256_hex(blob),
        };

        let mut tx = self.pool.begin().await?;
        artifact_repository::insert_version(&mut *tx, &record).await?;
        artifact_repository::append_event(&mut *tx, id, model_name, ArtifactStatus::Candidate)
            .await?;
        tx.commit().await?;

        tracing::debug!("Staged candidate {} for {} (score {})", id, model_name, score);

        Ok(ArtifactVersion {
            id: record.id,
            model_name: record.model_name,
            created_at: record.created_at,
            score: record.score,
            blob_location: record.blob_location,
            blob_sha256: record.blob_sha256,
            status: ArtifactStatus::Candidate,
        })
    }

    /// Cut over to `version_id`, superseding whatever was promoted before
    pub async fn promote(&self, version_id: Uuid) -> Result<ArtifactVersion, StoreError> {
        let model_name = artifact_repository::find_model_name(&self.pool, version_id)
            .await?
            .ok_or(StoreError::VersionNotFound(version_id))?;

        let _guard = self.lock_model(&model_name).await;
        let history = self.load_history(&model_name).await?;
        self.cutover(&history, version_id).await
    }

    /// Reverse the most recent cutover: the promoted version is rolled back
    /// and the one it superseded is promoted again.
    ///
    /// Fails with `NoPreviousVersion`, leaving state unchanged, when there is
    /// nothing to go back to.
    pub async fn rollback(&self, model_name: &str) -> Result<ArtifactVersion, StoreError> {
        let _guard = self.lock_model(model_name).await;
        let history = self.load_history(model_name).await?;

        let (Some(current), Some(previous)) = (history.promoted(), history.previous_promoted())
        else {
            return Err(StoreError::NoPreviousVersion(model_name.to_string()));
        };

        let mut tx = self.pool.begin().await?;
        artifact_repository::append_event(
            &mut *tx,
            current.id,
            model_name,
            ArtifactStatus::RolledBack,
        )
        .await?;
        artifact_repository::append_event(
            &mut *tx,
            previous.id,
            model_name,
            ArtifactStatus::Promoted,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            "Rolled back {} from {} to {}",
            model_name,
            current.id,
            previous.id
        );

        Ok(ArtifactVersion {
            status: ArtifactStatus::Promoted,
            ..previous.clone()
        })
    }

    /// Judge a staged candidate and apply the verdict in one critical
    /// section.
    ///
    /// `decide` sees the version in service at the moment the lock is held,
    /// so concurrent runs of the same model can never act on a stale
    /// comparison.
    pub async fn settle<F>(
        &self,
        candidate: &ArtifactVersion,
        decide: F,
    ) -> Result<Settlement, StoreError>
    where
        F: FnOnce(Option<&ArtifactVersion>) -> Decision,
    {
        let model_name = candidate.model_name.as_str();
        let _guard = self.lock_model(model_name).await;
        let history = self.load_history(model_name).await?;

        let staged = history
            .get(candidate.id)
            .ok_or(StoreError::VersionNotFound(candidate.id))?;
        if staged.status != ArtifactStatus::Candidate {
            return Err(StoreError::InvalidTransition {
                id: staged.id,
                from: staged.status,
                to: ArtifactStatus::Promoted,
            });
        }

        let previous = history.promoted().cloned();

        match decide(previous.as_ref()) {
            Decision::Promote => {
                let version = self.cutover(&history, candidate.id).await?;
                Ok(Settlement::Promoted { version, previous })
            }
            Decision::Reject => {
                artifact_repository::append_event(
                    &self.pool,
                    candidate.id,
                    model_name,
                    ArtifactStatus::RolledBack,
                )
                .await?;

                Ok(Settlement::Rejected {
                    candidate: ArtifactVersion {
                        status: ArtifactStatus::RolledBack,
                        ..staged.clone()
                    },
                    kept: previous,
                })
            }
        }
    }

    /// Roll back a staged candidate that could not be settled.
    ///
    /// Reads only the candidate's own journal entries, so it still works
    /// when the rest of the model's history fails to replay. Versions that
    /// already left the Candidate state are left alone.
    pub async fn discard(&self, candidate: &ArtifactVersion) -> Result<(), StoreError> {
        let model_name = candidate.model_name.as_str();
        let _guard = self.lock_model(model_name).await;

        let events = artifact_repository::find_events(&self.pool, model_name).await?;
        let last = events
            .iter()
            .filter(|e| e.version_id == candidate.id)
            .map(|e| e.status)
            .last();

        if last == Some(ArtifactStatus::Candidate) {
            artifact_repository::append_event(
                &self.pool,
                candidate.id,
                model_name,
                ArtifactStatus::RolledBack,
            )
            .await?;
            tracing::warn!("Discarded candidate {} of {}", candidate.id, model_name);
        }

        Ok(())
    }

    /// Blob bytes of a version, verified against the stored digest
    pub async fn read_blob(&self, version_id: Uuid) -> Result<Vec<u8>, StoreError> {
        let version = self.get_version(version_id).await?;
        let bytes = tokio::fs::read(self.blob_path(&version.blob_location)).await?;

        let digest = sha256_hex(&bytes);
        if digest != version.blob_sha256 {
            return Err(StoreError::Corrupt(format!(
                "blob of version {} has digest {}, expected {}",
                version_id, digest, version.blob_sha256
            )));
        }

        Ok(bytes)
    }

    // Caller must hold the model lock.
    async fn cutover(
        &self,
        history: &VersionHistory,
        version_id: Uuid,
    ) -> Result<ArtifactVersion, StoreError> {
        let target = history
            .get(version_id)
            .ok_or(StoreError::VersionNotFound(version_id))?;

        if !target.status.can_transition_to(ArtifactStatus::Promoted) {
            return Err(StoreError::InvalidTransition {
                id: version_id,
                from: target.status,
                to: ArtifactStatus::Promoted,
            });
        }

        let model_name = history.model_name();
        let mut tx = self.pool.begin().await?;
        if let Some(current) = history.promoted() {
            artifact_repository::append_event(
                &mut *tx,
                current.id,
                model_name,
                ArtifactStatus::Superseded,
            )
            .await?;
        }
        artifact_repository::append_event(
            &mut *tx,
            version_id,
            model_name,
            ArtifactStatus::Promoted,
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Promoted {} version {}", model_name, version_id);

        Ok(ArtifactVersion {
            status: ArtifactStatus::Promoted,
            ..target.clone()
        })
    }

    async fn write_blob(&self, location: &str, blob: &[u8]) -> Result<(), StoreError> {
        let path = self.blob_path(location);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("bin.tmp");
        if let Err(e) = tokio::fs::write(&tmp, blob).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &path).await?;

        Ok(())
    }

    fn blob_path(&self, location: &str) -> PathBuf {
        self.blob_dir.join(Path::new(location))
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use gantry_core::gate;
    use tempfile::TempDir;

    async fn store() -> (ArtifactStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(test_pool().await, dir.path());
        (store, dir)
    }

    fn higher_is_better(candidate: f64) -> impl FnOnce(Option<&ArtifactVersion>) -> Decision {
        move |previous: Option<&ArtifactVersion>| match previous {
            None => Decision::Promote,
            Some(p) if candidate > p.score => Decision::Promote,
            Some(_) => Decision::Reject,
        }
    }

    #[tokio::test]
    async fn test_bootstrap_candidate_is_promoted() {
        let (store, _dir) = store().await;
        assert!(store.get_promoted("m").await.unwrap().is_none());

        let candidate = store.stage_candidate("m", b"v1", -5.0).await.unwrap();
        assert_eq!(candidate.status, ArtifactStatus::Candidate);
        // staging alone never promotes
        assert!(store.get_promoted("m").await.unwrap().is_none());

        let settlement = store
            .settle(&candidate, |previous| {
                assert!(previous.is_none());
                Decision::Promote
            })
            .await
            .unwrap();

        match settlement {
            Settlement::Promoted { version, previous } => {
                assert_eq!(version.id, candidate.id);
                assert!(previous.is_none());
            }
            other => panic!("unexpected settlement {:?}", other),
        }
        assert_eq!(
            store.get_promoted("m").await.unwrap().unwrap().id,
            candidate.id
        );
    }

    #[tokio::test]
    async fn test_rejected_candidate_keeps_promoted() {
        let (store, _dir) = store().await;

        let v1 = store.stage_candidate("m", b"good", 0.92).await.unwrap();
        store.settle(&v1, higher_is_better(0.92)).await.unwrap();

        let v2 = store.stage_candidate("m", b"worse", 0.80).await.unwrap();
        let settlement = store.settle(&v2, higher_is_better(0.80)).await.unwrap();

        match settlement {
            Settlement::Rejected { candidate, kept } => {
                assert_eq!(candidate.status, ArtifactStatus::RolledBack);
                assert_eq!(kept.unwrap().id, v1.id);
            }
            other => panic!("unexpected settlement {:?}", other),
        }

        let history = store.history("m").await.unwrap();
        assert_eq!(history.versions().len(), 2);
        assert_eq!(history.promoted().unwrap().id, v1.id);
        assert_eq!(history.get(v2.id).unwrap().status, ArtifactStatus::RolledBack);
    }

    #[tokio::test]
    async fn test_settle_twice_is_rejected() {
        let (store, _dir) = store().await;
        let v1 = store.stage_candidate("m", b"a", 1.0).await.unwrap();
        store.settle(&v1, |_| Decision::Promote).await.unwrap();

        let err = store.settle(&v1, |_| Decision::Promote).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: ArtifactStatus::Promoted,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_promote_supersedes_previous() {
        let (store, _dir) = store().await;
        let v1 = store.stage_candidate("m", b"a", 1.0).await.unwrap();
        let v2 = store.stage_candidate("m", b"b", 2.0).await.unwrap();

        store.promote(v1.id).await.unwrap();
        store.promote(v2.id).await.unwrap();

        let history = store.history("m").await.unwrap();
        assert_eq!(history.get(v1.id).unwrap().status, ArtifactStatus::Superseded);
        assert_eq!(history.promoted().unwrap().id, v2.id);
        assert_eq!(history.previous_promoted().unwrap().id, v1.id);

        assert!(matches!(
            store.promote(Uuid::new_v4()).await,
            Err(StoreError::VersionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rollback_restores_identical_blob() {
        let (store, _dir) = store().await;

        let v1 = store.stage_candidate("m", b"first artifact", 0.5).await.unwrap();
        store.settle(&v1, higher_is_better(0.5)).await.unwrap();
        let v2 = store.stage_candidate("m", b"second artifact", 0.7).await.unwrap();
        store.settle(&v2, higher_is_better(0.7)).await.unwrap();

        let restored = store.rollback("m").await.unwrap();
        assert_eq!(restored.id, v1.id);
        assert_eq!(restored.status, ArtifactStatus::Promoted);

        let promoted = store.get_promoted("m").await.unwrap().unwrap();
        assert_eq!(promoted.id, v1.id);
        assert_eq!(store.read_blob(promoted.id).await.unwrap(), b"first artifact");

        let history = store.history("m").await.unwrap();
        assert_eq!(history.get(v2.id).unwrap().status, ArtifactStatus::RolledBack);
    }

    #[tokio::test]
    async fn test_rollback_without_previous_version() {
        let (store, _dir) = store().await;

        assert!(matches!(
            store.rollback("m").await,
            Err(StoreError::NoPreviousVersion(_))
        ));

        let v1 = store.stage_candidate("m", b"only", 1.0).await.unwrap();
        store.settle(&v1, |_| Decision::Promote).await.unwrap();

        assert!(matches!(
            store.rollback("m").await,
            Err(StoreError::NoPreviousVersion(_))
        ));

        let history = store.history("m").await.unwrap();
        assert_eq!(history.versions().len(), 1);
        assert_eq!(history.promoted().unwrap().id, v1.id);
    }

    #[tokio::test]
    async fn test_read_blob_detects_corruption() {
        let (store, dir) = store().await;
        let v1 = store.stage_candidate("m", b"payload", 1.0).await.unwrap();

        std::fs::write(dir.path().join(&v1.blob_location), b"tampered").unwrap();

        assert!(matches!(
            store.read_blob(v1.id).await,
            Err(StoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn test_discard_unsettled_candidate() {
        let (store, _dir) = store().await;
        let v1 = store.stage_candidate("m", b"one", 1.0).await.unwrap();
        store.promote(v1.id).await.unwrap();
        let v2 = store.stage_candidate("m", b"two", 2.0).await.unwrap();
        store.promote(v2.id).await.unwrap();
        let v3 = store.stage_candidate("m", b"three", 3.0).await.unwrap();

        // two promoted versions: the model's history no longer replays
        artifact_repository::append_event(&store.pool, v1.id, "m", ArtifactStatus::Promoted)
            .await
            .unwrap();
        assert!(matches!(
            store.settle(&v3, |_| Decision::Promote).await,
            Err(StoreError::Corrupt(_))
        ));

        store.discard(&v3).await.unwrap();
        let last_status = |id: Uuid, events: &[gantry_core::domain::artifact::StatusEvent]| {
            events.iter().filter(|e| e.version_id == id).last().unwrap().status
        };
        let events = artifact_repository::find_events(&store.pool, "m").await.unwrap();
        assert_eq!(last_status(v3.id, &events), ArtifactStatus::RolledBack);

        // settled versions are not touched
        store.discard(&v2).await.unwrap();
        let again = artifact_repository::find_events(&store.pool, "m").await.unwrap();
        assert_eq!(again.len(), events.len());
        assert_eq!(last_status(v2.id, &again), ArtifactStatus::Promoted);
    }

    #[tokio::test]
    async fn test_single_promoted_under_concurrency() {
        let (store, _dir) = store().await;
        let store = Arc::new(store);
        let definition = gantry_core::domain::model::ModelDefinition {
            name: "m".to_string(),
            category: gantry_core::domain::model::Category::Basic,
            score_direction: gantry_core::domain::model::ScoreDirection::HigherIsBetter,
            entry_point: gantry_core::domain::model::EntryPoint::Command {
                program: "true".to_string(),
                args: vec![],
                env: Default::default(),
            },
            hyperparams: Default::default(),
            timeout_seconds: None,
        };
        let definition = Arc::new(definition);

        let mut handles = Vec::new();
        for i in 0..12 {
            let store = store.clone();
            let definition = definition.clone();
            // scores deliberately not monotonic in spawn order
            let score = ((i * 7) % 12) as f64;
            handles.push(tokio::spawn(async move {
                let candidate = store
                    .stage_candidate("m", format!("blob {}", i).as_bytes(), score)
                    .await
                    .unwrap();
                store
                    .settle(&candidate, |previous| {
                        gate::decide(&definition, candidate.score, previous.map(|p| p.score))
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let history = store.history("m").await.unwrap();
        let promoted: Vec<_> = history
            .versions()
            .iter()
            .filter(|v| v.status == ArtifactStatus::Promoted)
            .collect();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].score, 11.0);
        assert!(
            history
                .versions()
                .iter()
                .all(|v| v.status != ArtifactStatus::Candidate)
        );
    }

    #[tokio::test]
    async fn test_models_are_independent() {
        let (store, _dir) = store().await;
        let a = store.stage_candidate("a", b"a", 1.0).await.unwrap();
        store.settle(&a, |_| Decision::Promote).await.unwrap();

        assert!(store.get_promoted("b").await.unwrap().is_none());
        assert!(store.history("b").await.unwrap().is_empty());
    }
}
