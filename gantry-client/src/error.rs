//! Error types for the Gantry client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Gantry client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create an API error from a status code and a response body
    ///
    /// The orchestrator answers errors with `{"error": "..."}`; the message is
    /// extracted when the body has that shape and kept verbatim otherwise.
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);

        Self::ApiError { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if the request conflicted with current state, e.g. a rollback
    /// with no previous version
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(s) if s >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_extracts_message() {
        let err = ClientError::api_error(409, r#"{"error":"model m has no previous version to roll back to"}"#);
        assert!(err.is_conflict());
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "API error (status 409): model m has no previous version to roll back to"
        );
    }

    #[test]
    fn test_api_error_keeps_plain_body() {
        let err = ClientError::api_error(502, "bad gateway");
        assert!(err.is_server_error());
        assert!(!err.is_not_found());
        match err {
            ClientError::ApiError { message, .. } => assert_eq!(message, "bad gateway"),
            _ => panic!("expected ApiError"),
        }
    }
}
