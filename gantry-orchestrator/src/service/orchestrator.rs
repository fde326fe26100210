//! Orchestrator
//!
//! Drives one pipeline run over a set of catalogue entries. Categories run
//! strictly in `Category::ORDER`, each one a barrier; models inside a
//! category run concurrently on a bounded worker pool.
//!
//! Per model:
//! `Pending -> Running -> Succeeded -> {Promoted | RolledBack}`, or
//! `Running -> {Failed | TimedOut}` with no artifact created.
//! Nothing that happens to one model can stop another from running.

use chrono::Utc;
use gantry_core::domain::artifact::ArtifactVersion;
use gantry_core::domain::dataset::DatasetHandle;
use gantry_core::domain::model::{Category, ModelDefinition};
use gantry_core::domain::notification::{NotificationEvent, Severity};
use gantry_core::domain::run::{ModelState, RunOutcome, TrainingRun};
use gantry_core::gate;
use gantry_runner::{CancelSignal, ExecutionResult, JobRunner, TrainingOutput};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::catalogue::CatalogueEntry;
use crate::repository::run_repository;
use crate::service::artifact::{ArtifactStore, Settlement, StoreError};
use crate::service::notification::NotificationEmitter;

/// Terminal result of one model within a pipeline run
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub model_name: String,
    pub category: Category,
    pub state: ModelState,
    pub run: TrainingRun,
    /// The staged candidate, whatever became of it
    pub version: Option<ArtifactVersion>,
    pub notifications: Vec<NotificationEvent>,
}

struct Verdict {
    state: ModelState,
    outcome: RunOutcome,
    error_detail: Option<String>,
    version: Option<ArtifactVersion>,
    notification: NotificationEvent,
}

#[derive(Clone)]
pub struct Orchestrator {
    pool: SqlitePool,
    store: Arc<ArtifactStore>,
    emitter: NotificationEmitter,
    runner: JobRunner,
    max_parallel_jobs: usize,
}

impl Orchestrator {
    pub fn new(
        pool: SqlitePool,
        store: Arc<ArtifactStore>,
        emitter: NotificationEmitter,
        runner: JobRunner,
        max_parallel_jobs: usize,
    ) -> Self {
        Self {
            pool,
            store,
            emitter,
            runner,
            max_parallel_jobs: max_parallel_jobs.max(1),
        }
    }

    /// Train every entry once, category by category.
    ///
    /// Returns one outcome per entry, in execution order.
    pub async fn run(
        &self,
        run_id: Uuid,
        dataset: &DatasetHandle,
        entries: &[CatalogueEntry],
        cancel: &CancelSignal,
    ) -> Vec<ModelOutcome> {
        let mut outcomes = Vec::with_capacity(entries.len());

        for category in Category::ORDER {
            let stage: Vec<CatalogueEntry> = entries
                .iter()
                .filter(|e| e.definition.category == category)
                .cloned()
                .collect();
            if stage.is_empty() {
                continue;
            }

            tracing::info!(
                "Run {}: starting category {} ({} models)",
                run_id,
                category,
                stage.len()
            );
            outcomes.extend(self.run_category(run_id, dataset, stage, cancel).await);
        }

        outcomes
    }

    async fn run_category(
        &self,
        run_id: Uuid,
        dataset: &DatasetHandle,
        stage: Vec<CatalogueEntry>,
        cancel: &CancelSignal,
    ) -> Vec<ModelOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_jobs));
        let mut handles = Vec::with_capacity(stage.len());

        for entry in stage {
            let name = entry.definition.name.clone();
            let category = entry.definition.category;
            let this = self.clone();
            let dataset = dataset.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                // the semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                this.process_model(run_id, &dataset, entry, cancel).await
            });
            handles.push((name, category, handle));
        }

        // Barrier: the next category starts only once all of these finished
        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, category, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::error!("Task for {} ended unexpectedly: {}", name, e);
                    let started_at = Utc::now();
                    let verdict = self
                        .failed(run_id, &name, format!("model task ended unexpectedly: {}", e))
                        .await;
                    outcomes.push(self.finish(run_id, &name, category, started_at, verdict).await);
                }
            }
        }

        outcomes
    }

    async fn process_model(
        &self,
        run_id: Uuid,
        dataset: &DatasetHandle,
        entry: CatalogueEntry,
        cancel: CancelSignal,
    ) -> ModelOutcome {
        let definition = &entry.definition;
        let name = definition.name.as_str();
        let started_at = Utc::now();

        tracing::debug!("Run {}: training {}", run_id, name);

        let result = self
            .runner
            .run(entry.job.clone(), definition, dataset, cancel)
            .await;

        let verdict = match result {
            ExecutionResult::Success { output, elapsed } => {
                tracing::debug!("{} trained in {:?} (score {})", name, elapsed, output.score);
                self.judge(run_id, definition, output).await
            }
            ExecutionResult::Timeout { after } => {
                let detail = format!("training timed out after {}s", after.as_secs_f64());
                let notification = self
                    .emitter
                    .emit(
                        Some(run_id),
                        name,
                        Severity::Error,
                        format!("{}; promoted version unchanged", detail),
                    )
                    .await;
                Verdict {
                    state: ModelState::TimedOut,
                    outcome: RunOutcome::TimedOut,
                    error_detail: Some(detail),
                    version: None,
                    notification,
                }
            }
            other => {
                let detail = other
                    .error_detail()
                    .unwrap_or_else(|| "training failed".to_string());
                self.failed(run_id, name, detail).await
            }
        };

        self.finish(run_id, name, definition.category, started_at, verdict)
            .await
    }

    /// Stage a trained candidate and let the quality gate settle it
    async fn judge(
        &self,
        run_id: Uuid,
        definition: &ModelDefinition,
        output: TrainingOutput,
    ) -> Verdict {
        let name = definition.name.as_str();

        let candidate = match self
            .store
            .stage_candidate(name, &output.blob, output.score)
            .await
        {
            Ok(candidate) => candidate,
            Err(e) => return self.storage_failure(run_id, name, e).await,
        };

        let score = candidate.score;
        let settlement = self
            .store
            .settle(&candidate, |previous| {
                gate::decide(definition, score, previous.map(|p| p.score))
            })
            .await;

        match settlement {
            Ok(Settlement::Promoted { version, previous }) => {
                let message = match &previous {
                    Some(p) => format!(
                        "promoted version {} (score {}), replacing {} (score {})",
                        version.id, version.score, p.id, p.score
                    ),
                    None => format!(
                        "promoted version {} (score {}), first version in service",
                        version.id, version.score
                    ),
                };
                let notification = self
                    .emitter
                    .emit(Some(run_id), name, Severity::Success, message)
                    .await;
                Verdict {
                    state: ModelState::Promoted,
                    outcome: RunOutcome::Succeeded,
                    error_detail: None,
                    version: Some(version),
                    notification,
                }
            }
            Ok(Settlement::Rejected { candidate, kept }) => {
                let message = match &kept {
                    Some(k) => format!(
                        "candidate {} (score {}) is not better than promoted {} (score {}); rolled back",
                        candidate.id, candidate.score, k.id, k.score
                    ),
                    None => format!(
                        "candidate {} (score {}) rejected; model has no promoted version",
                        candidate.id, candidate.score
                    ),
                };
                let notification = self
                    .emitter
                    .emit(Some(run_id), name, Severity::Warning, message)
                    .await;
                Verdict {
                    state: ModelState::RolledBack,
                    outcome: RunOutcome::Succeeded,
                    error_detail: None,
                    version: Some(candidate),
                    notification,
                }
            }
            Err(e) => {
                if let Err(discard_err) = self.store.discard(&candidate).await {
                    tracing::error!(
                        "Failed to discard candidate {} of {}: {}",
                        candidate.id,
                        name,
                        discard_err
                    );
                }
                self.storage_failure(run_id, name, e).await
            }
        }
    }

    async fn storage_failure(&self, run_id: Uuid, name: &str, err: StoreError) -> Verdict {
        self.failed(run_id, name, format!("artifact storage failed: {}", err))
            .await
    }

    async fn failed(&self, run_id: Uuid, name: &str, detail: String) -> Verdict {
        let notification = self
            .emitter
            .emit(
                Some(run_id),
                name,
                Severity::Error,
                format!("{}; promoted version unchanged", detail),
            )
            .await;
        Verdict {
            state: ModelState::Failed,
            outcome: RunOutcome::Failed,
            error_detail: Some(detail),
            version: None,
            notification,
        }
    }

    /// Persist the terminal TrainingRun and package the outcome
    async fn finish(
        &self,
        run_id: Uuid,
        name: &str,
        category: Category,
        started_at: chrono::DateTime<Utc>,
        verdict: Verdict,
    ) -> ModelOutcome {
        let run = TrainingRun {
            id: Uuid::new_v4(),
            pipeline_run_id: run_id,
            model_name: name.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcome: verdict.outcome,
            error_detail: verdict.error_detail,
        };

        if let Err(e) = run_repository::insert(&self.pool, &run).await {
            tracing::error!("Failed to persist training run for {}: {}", name, e);
        }

        ModelOutcome {
            model_name: name.to_string(),
            category,
            state: verdict.state,
            run,
            version: verdict.version,
            notifications: vec![verdict.notification],
        }
    }
}
