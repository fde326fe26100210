//! Data Transfer Objects for the HTTP API
//!
//! Request and response bodies exchanged between the orchestrator and its
//! clients (CLI, dashboard).

pub mod model;
pub mod notification;
pub mod pipeline;
