//! Gantry Orchestrator
//!
//! Control plane of the model-artifact pipeline: retrains a fixed catalogue
//! of models, versions every artifact, and promotes or rolls back each one
//! through the quality gate.
//!
//! Layers:
//! - `repository`: SQLite journal access, no business rules
//! - `service`: artifact store, notification emitter, orchestrator, controller
//! - `api`: axum handlers over the services

pub mod api;
pub mod catalogue;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
