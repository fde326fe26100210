//! Gantry Runner
//!
//! Executes external training jobs as isolated units of work.
//!
//! Architecture:
//! - Job: the `TrainingJob` capability every model definition resolves to
//! - Execution: the Job Runner, which enforces deadlines and cancellation and
//!   converts every failure (errors and panics alike) into a result value
//! - Command: training jobs backed by an external program
//! - Dataset: the dataset-ingestion collaborator

pub mod cancel;
pub mod command;
pub mod dataset;
pub mod execution;
pub mod job;

pub use cancel::{CancelHandle, CancelSignal};
pub use command::CommandJob;
pub use dataset::{DatasetIngestor, FileIngestor, IngestionError};
pub use execution::{ExecutionResult, JobRunner};
pub use job::{TrainingJob, TrainingOutput};
