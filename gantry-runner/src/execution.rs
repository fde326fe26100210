//! Job Runner
//!
//! Runs exactly one training job per call as its own tokio task, so a job
//! that errors, panics or hangs cannot take the caller down with it.
//! There is no retry logic here; retries are a caller decision.

use gantry_core::domain::dataset::DatasetHandle;
use gantry_core::domain::model::ModelDefinition;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cancel::CancelSignal;
use crate::job::{TrainingJob, TrainingOutput};

/// Result of one job execution
///
/// These only exist between the runner and the orchestrator; they are not
/// persisted as-is.
#[derive(Debug)]
pub enum ExecutionResult {
    Success {
        output: TrainingOutput,
        elapsed: Duration,
    },
    Failure {
        error: String,
    },
    Timeout {
        after: Duration,
    },
    Cancelled,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    /// Diagnostic message for unsuccessful executions
    pub fn error_detail(&self) -> Option<String> {
        match self {
            ExecutionResult::Success { .. } => None,
            ExecutionResult::Failure { error } => Some(error.clone()),
            ExecutionResult::Timeout { after } => {
                Some(format!("training timed out after {}s", after.as_secs_f64()))
            }
            ExecutionResult::Cancelled => Some("training cancelled".to_string()),
        }
    }
}

/// Executes training jobs with a deadline
#[derive(Debug, Clone)]
pub struct JobRunner {
    default_timeout: Duration,
}

impl JobRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Timeout for a model: its own override, else the runner default
    pub fn timeout_for(&self, definition: &ModelDefinition) -> Duration {
        definition
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    /// Runs one training job to a terminal result.
    ///
    /// Never panics and never returns an error: failures, panics, timeouts
    /// and cancellation are all reported through `ExecutionResult`. On
    /// timeout or cancellation the job task is aborted and awaited.
    pub async fn run(
        &self,
        job: Arc<dyn TrainingJob>,
        definition: &ModelDefinition,
        dataset: &DatasetHandle,
        mut cancel: CancelSignal,
    ) -> ExecutionResult {
        if cancel.is_cancelled() {
            return ExecutionResult::Cancelled;
        }

        let timeout = self.timeout_for(definition);
        let dataset = dataset.clone();
        let hyperparams = definition.hyperparams.clone();
        let started = Instant::now();

        debug!(
            "Starting training job for {} (timeout {:?})",
            definition.name, timeout
        );

        let mut handle = tokio::spawn(async move { job.train(&dataset, &hyperparams).await });

        let result = tokio::select! {
            joined = &mut handle => match joined {
                Ok(Ok(output)) if !output.score.is_finite() => ExecutionResult::Failure {
                    error: format!("training job reported a non-finite score ({})", output.score),
                },
                Ok(Ok(output)) => ExecutionResult::Success {
                    output,
                    elapsed: started.elapsed(),
                },
                Ok(Err(e)) => ExecutionResult::Failure {
                    error: format!("{:#}", e),
                },
                Err(e) if e.is_panic() => ExecutionResult::Failure {
                    error: format!("training job panicked: {}", panic_message(e.into_panic())),
                },
                Err(e) => ExecutionResult::Failure {
                    error: format!("training task ended unexpectedly: {}", e),
                },
            },
            _ = tokio::time::sleep(timeout) => {
                handle.abort();
                ExecutionResult::Timeout { after: timeout }
            }
            _ = cancel.cancelled() => {
                handle.abort();
                ExecutionResult::Cancelled
            }
        };

        // Wait for the aborted job to be dropped so its guards (child
        // processes, scratch dirs) are released before we report.
        if matches!(
            result,
            ExecutionResult::Timeout { .. } | ExecutionResult::Cancelled
        ) {
            let _ = (&mut handle).await;
        }

        if let Some(detail) = result.error_detail() {
            warn!("Training job for {} did not succeed: {}", definition.name, detail);
        }

        result
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gantry_core::domain::model::{Category, EntryPoint, Hyperparams, ScoreDirection};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn definition(timeout_seconds: Option<u64>) -> ModelDefinition {
        ModelDefinition {
            name: "brand_classifier".to_string(),
            category: Category::Basic,
            score_direction: ScoreDirection::HigherIsBetter,
            entry_point: EntryPoint::Command {
                program: "true".to_string(),
                args: vec![],
                env: Default::default(),
            },
            hyperparams: Hyperparams::from([("lr".to_string(), serde_json::json!(0.1))]),
            timeout_seconds,
        }
    }

    fn dataset() -> DatasetHandle {
        DatasetHandle {
            id: uuid::Uuid::new_v4(),
            location: "data.csv".to_string(),
            fingerprint: "00".to_string(),
            size_bytes: 1,
            ingested_at: chrono::Utc::now(),
        }
    }

    enum Behaviour {
        Succeed(f64),
        Fail,
        Panic,
        Hang,
    }

    struct FakeJob {
        behaviour: Behaviour,
        finished: Arc<AtomicBool>,
    }

    impl FakeJob {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                finished: Arc::new(AtomicBool::new(false)),
            })
        }
    }

    #[async_trait]
    impl TrainingJob for FakeJob {
        async fn train(
            &self,
            _dataset: &DatasetHandle,
            hyperparams: &Hyperparams,
        ) -> anyhow::Result<TrainingOutput> {
            assert_eq!(hyperparams["lr"], serde_json::json!(0.1));
            match self.behaviour {
                Behaviour::Succeed(score) => Ok(TrainingOutput {
                    blob: b"model".to_vec(),
                    score,
                }),
                Behaviour::Fail => anyhow::bail!("out of memory"),
                Behaviour::Panic => panic!("index out of bounds"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    self.finished.store(true, Ordering::SeqCst);
                    unreachable!()
                }
            }
        }
    }

    #[tokio::test]
    async fn test_success() {
        let runner = JobRunner::new(Duration::from_secs(5));
        let result = runner
            .run(
                FakeJob::new(Behaviour::Succeed(0.9)),
                &definition(None),
                &dataset(),
                CancelSignal::never(),
            )
            .await;

        match result {
            ExecutionResult::Success { output, .. } => {
                assert_eq!(output.blob, b"model".to_vec());
                assert_eq!(output.score, 0.9);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_is_captured() {
        let runner = JobRunner::new(Duration::from_secs(5));
        let result = runner
            .run(
                FakeJob::new(Behaviour::Fail),
                &definition(None),
                &dataset(),
                CancelSignal::never(),
            )
            .await;

        assert!(!result.is_success());
        assert!(result.error_detail().unwrap().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let runner = JobRunner::new(Duration::from_secs(5));
        let result = runner
            .run(
                FakeJob::new(Behaviour::Panic),
                &definition(None),
                &dataset(),
                CancelSignal::never(),
            )
            .await;

        match result {
            ExecutionResult::Failure { error } => {
                assert!(error.contains("panicked"));
                assert!(error.contains("index out of bounds"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_finite_score_is_a_failure() {
        let runner = JobRunner::new(Duration::from_secs(5));
        let result = runner
            .run(
                FakeJob::new(Behaviour::Succeed(f64::NAN)),
                &definition(None),
                &dataset(),
                CancelSignal::never(),
            )
            .await;

        assert!(matches!(result, ExecutionResult::Failure { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_job() {
        let runner = JobRunner::new(Duration::from_secs(3600 * 24));
        let job = FakeJob::new(Behaviour::Hang);
        let finished = job.finished.clone();

        let result = runner
            .run(job, &definition(Some(2)), &dataset(), CancelSignal::never())
            .await;

        match result {
            ExecutionResult::Timeout { after } => assert_eq!(after, Duration::from_secs(2)),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let runner = JobRunner::new(Duration::from_secs(60));
        let (handle, signal) = CancelSignal::pair();

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(
                        FakeJob::new(Behaviour::Hang),
                        &definition(None),
                        &dataset(),
                        signal,
                    )
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, ExecutionResult::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_start() {
        let runner = JobRunner::new(Duration::from_secs(60));
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();

        let result = runner
            .run(
                FakeJob::new(Behaviour::Panic),
                &definition(None),
                &dataset(),
                signal,
            )
            .await;
        assert!(matches!(result, ExecutionResult::Cancelled));
    }

    #[test]
    fn test_timeout_for_uses_override() {
        let runner = JobRunner::new(Duration::from_secs(300));
        assert_eq!(runner.timeout_for(&definition(None)), Duration::from_secs(300));
        assert_eq!(runner.timeout_for(&definition(Some(5))), Duration::from_secs(5));
    }
}
