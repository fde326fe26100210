//! Gantry HTTP Client
//!
//! A type-safe HTTP client for the Gantry orchestrator API, used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use gantry_client::GantryClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GantryClient::new("http://localhost:8080");
//!
//!     let report = client.run_pipeline(None).await?;
//!     println!("{} of {} models succeeded", report.succeeded, report.total_models);
//!     Ok(())
//! }
//! ```

pub mod error;
mod models;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Gantry orchestrator API
///
/// Methods are grouped by resource:
/// - Pipeline runs, cancellation and the notification log
/// - Models: listing, version history, training runs, rollback, artifacts
#[derive(Debug, Clone)]
pub struct GantryClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl GantryClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use gantry_client::GantryClient;
    ///
    /// let client = GantryClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// Pipeline runs block until every model finished, so callers usually
    /// want a generous (or no) request timeout.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!("Orchestrator answered {}: {}", status, error_text);
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        self.check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response carrying raw bytes
    async fn handle_bytes(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let bytes = self.check_status(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GantryClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GantryClient::new("http://localhost:8080/");
        assert_eq!(client.url("/models"), "http://localhost:8080/models");
    }
}
