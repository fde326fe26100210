//! Training job capability

use async_trait::async_trait;
use gantry_core::domain::dataset::DatasetHandle;
use gantry_core::domain::model::Hyperparams;

/// What a training job hands back on success
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutput {
    /// Serialized model
    pub blob: Vec<u8>,
    /// Evaluation score, compared by the quality gate
    pub score: f64,
}

/// A black box supplying one learning algorithm
///
/// Implementations may fail with arbitrary errors or even panic; the
/// `JobRunner` contains both.
#[async_trait]
pub trait TrainingJob: Send + Sync {
    async fn train(
        &self,
        dataset: &DatasetHandle,
        hyperparams: &Hyperparams,
    ) -> anyhow::Result<TrainingOutput>;
}
