//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and other settings.

use anyhow::{Context, Result};
use gantry_client::GantryClient;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
}

impl Config {
    /// Client for the configured orchestrator
    ///
    /// Only connecting is bounded: a pipeline run answers once every model
    /// has finished training.
    pub fn client(&self) -> Result<GantryClient> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(GantryClient::with_client(&self.orchestrator_url, http))
    }
}
