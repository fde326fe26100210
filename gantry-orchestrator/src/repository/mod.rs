//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles database operations for a specific domain entity.
//! Functions accept any SQLite executor so they can run against the pool or
//! inside a transaction.

pub mod artifact;
pub mod notification;
pub mod run;

// Re-export for convenience
pub use artifact as artifact_repository;
pub use notification as notification_repository;
pub use run as run_repository;
