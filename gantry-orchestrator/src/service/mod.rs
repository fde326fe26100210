//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod artifact;
pub mod controller;
pub mod notification;
pub mod orchestrator;

pub use artifact::{ArtifactStore, Settlement, StoreError};
pub use controller::{PipelineController, PipelineError};
pub use notification::NotificationEmitter;
pub use orchestrator::{ModelOutcome, Orchestrator};
