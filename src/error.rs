//! Error types shared across the pipeline stages.
//!
//! Stage internals return these as `Result`s. The public stage entry points
//! ([`crate::summarize::Summarizer::summarize`] and
//! [`crate::classify::Classifier::classify`]) turn them into their documented
//! default values at the boundary, so callers never see them.

use thiserror::Error;

/// A single transport attempt failed before any HTTP status was received
/// (connection refused, DNS, timeout, body read failure).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError(format!("timeout: {e}"))
        } else if e.is_connect() {
            TransportError(format!("connection failed: {e}"))
        } else {
            TransportError(e.to_string())
        }
    }
}

/// Characters of an error response body kept in `RequestError`'s message.
/// Error pages can be arbitrarily large HTML.
pub const STATUS_BODY_PREVIEW: usize = 200;

/// Terminal failure of the retrying HTTP client.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server answered with a non-success status. For 429 and 5xx this is
    /// the last status seen after the attempt budget ran out; for any other
    /// 4xx it is returned on the first attempt.
    #[error(
        "HTTP {status} after {attempts} attempt(s): {}",
        crate::utils::truncate_for_log(.body, STATUS_BODY_PREVIEW)
    )]
    Status {
        status: u16,
        attempts: usize,
        body: String,
    },

    /// Every attempt failed at the transport level.
    #[error("request failed after {attempts} attempt(s): {cause}")]
    Transport { cause: String, attempts: usize },

    /// The response arrived but its body was not the JSON we expected.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RequestError {
    /// HTTP status of the last attempt, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures of the persistent article table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article already exists: {0}")]
    AlreadyExists(String),

    #[error("article not found: {0}")]
    NotFound(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failures while loading the pipeline configuration or an event payload.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON event: {0}")]
    Event(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = RequestError::Status {
            status: 503,
            attempts: 3,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("HTTP 503 after 3 attempt(s)"));

        let err = RequestError::Transport {
            cause: "timeout".to_string(),
            attempts: 2,
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_status_message_bounds_large_body() {
        let body = "<html>".repeat(2000);
        let err = RequestError::Status {
            status: 503,
            attempts: 1,
            body: body.clone(),
        };
        let message = err.to_string();
        assert!(message.starts_with("HTTP 503 after 1 attempt(s): <html>"));
        assert!(message.chars().count() < 300);
        assert!(message.ends_with(&format!("(+{} bytes)", body.len() - STATUS_BODY_PREVIEW)));
    }
}
