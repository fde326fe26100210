//! Core domain types
//!
//! This module contains the core domain structures used across Gantry crates.
//! They are shared between the orchestrator (which persists them), the runner
//! (which produces training output) and the client/CLI (which display them).

pub mod artifact;
pub mod dataset;
pub mod model;
pub mod notification;
pub mod report;
pub mod run;
