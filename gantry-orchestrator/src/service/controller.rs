//! Pipeline Controller
//!
//! Top-level entry point of a pipeline run: ingest the dataset, hand it to
//! the orchestrator, and fold the per-model outcomes into a report.
//! Only ingestion failures (and requests naming unknown models) abort a run;
//! everything else ends up in the report.

use gantry_core::domain::dataset::DatasetSource;
use gantry_core::domain::notification::Severity;
use gantry_core::domain::report::PipelineReport;
use gantry_runner::{CancelHandle, CancelSignal, DatasetIngestor, IngestionError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use uuid::Uuid;

use crate::catalogue::{CatalogueEntry, CatalogueError, ModelCatalogue};
use crate::service::notification::NotificationEmitter;
use crate::service::orchestrator::Orchestrator;

/// Model name recorded on notifications that concern a whole run
pub const PIPELINE_SUBJECT: &str = "pipeline";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dataset ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("unknown models: {}", .0.join(", "))]
    UnknownModels(Vec<String>),

    #[error("pipeline run {run_id} ended unexpectedly: {reason}")]
    Aborted { run_id: Uuid, reason: String },
}

type ActiveRuns = Arc<Mutex<HashMap<Uuid, CancelHandle>>>;

#[derive(Clone)]
pub struct PipelineController {
    ingestor: Arc<dyn DatasetIngestor>,
    orchestrator: Orchestrator,
    emitter: NotificationEmitter,
    active: ActiveRuns,
}

impl PipelineController {
    pub fn new(
        ingestor: Arc<dyn DatasetIngestor>,
        orchestrator: Orchestrator,
        emitter: NotificationEmitter,
    ) -> Self {
        Self {
            ingestor,
            orchestrator,
            emitter,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run the pipeline over `catalogue`, or over the named subset of it.
    ///
    /// The run executes on its own task: dropping the returned future
    /// abandons the report, not the run.
    pub async fn run_pipeline(
        &self,
        source: &DatasetSource,
        catalogue: &ModelCatalogue,
        subset: Option<&[String]>,
    ) -> Result<PipelineReport, PipelineError> {
        let entries = catalogue.select(subset).map_err(|e| match e {
            CatalogueError::UnknownModels(names) => PipelineError::UnknownModels(names),
            other => PipelineError::UnknownModels(vec![other.to_string()]),
        })?;

        let run_id = Uuid::new_v4();
        let this = self.clone();
        let source = source.clone();
        let task = tokio::spawn(async move { this.execute(run_id, source, entries).await });

        task.await.map_err(|e| PipelineError::Aborted {
            run_id,
            reason: e.to_string(),
        })?
    }

    async fn execute(
        &self,
        run_id: Uuid,
        source: DatasetSource,
        entries: Vec<CatalogueEntry>,
    ) -> Result<PipelineReport, PipelineError> {
        let started_at = chrono::Utc::now();

        tracing::info!(
            "Pipeline run {} started ({} models, dataset {})",
            run_id,
            entries.len(),
            source.location
        );

        let dataset = match self.ingestor.ingest(&source).await {
            Ok(dataset) => dataset,
            Err(e) => {
                self.emitter
                    .emit(
                        Some(run_id),
                        PIPELINE_SUBJECT,
                        Severity::Error,
                        format!("dataset ingestion failed, no models attempted: {}", e),
                    )
                    .await;
                return Err(PipelineError::Ingestion(e));
            }
        };

        let registration = ActiveRun::register(&self.active, run_id);
        let outcomes = self
            .orchestrator
            .run(run_id, &dataset, &entries, &registration.signal)
            .await;
        drop(registration);

        let notifications = outcomes
            .iter()
            .flat_map(|o| o.notifications.iter().cloned())
            .collect();
        let report = PipelineReport::build(
            run_id,
            dataset,
            started_at,
            outcomes.iter().map(|o| (o.category, o.state)),
            notifications,
        );

        tracing::info!(
            "Pipeline run {} finished: {} succeeded, {} failed",
            run_id,
            report.succeeded,
            report.failed
        );

        Ok(report)
    }

    /// Signal every active run to stop; returns the ids that were signalled
    pub fn cancel_all(&self) -> Vec<Uuid> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        for (run_id, handle) in active.iter() {
            tracing::warn!("Cancelling pipeline run {}", run_id);
            handle.cancel();
        }
        active.keys().copied().collect()
    }

    pub fn active_runs(&self) -> Vec<Uuid> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}

/// Keeps a run cancellable for as long as it is alive
struct ActiveRun {
    active: ActiveRuns,
    run_id: Uuid,
    signal: CancelSignal,
}

impl ActiveRun {
    fn register(active: &ActiveRuns, run_id: Uuid) -> Self {
        let (handle, signal) = CancelSignal::pair();
        active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run_id, handle);
        Self {
            active: active.clone(),
            run_id,
            signal,
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.run_id);
    }
}
