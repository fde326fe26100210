//! Gantry Core
//!
//! Core types and abstractions for the Gantry model-artifact pipeline.
//!
//! This crate contains:
//! - Domain types: catalogue entries, artifact versions, training runs,
//!   notifications and pipeline reports
//! - Quality gate: the promote/reject decision for freshly trained candidates
//! - DTOs: Data transfer objects for the HTTP API

pub mod domain;
pub mod dto;
pub mod gate;
