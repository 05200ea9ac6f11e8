//! Client Error Taxonomy
//!
//! Failures that terminate an exchange. Per-record decode failures are
//! not errors; they degrade to [`crate::protocol::StreamEvent::Unrecognized`]
//! and are logged by the dispatcher.

use thiserror::Error;

/// Errors surfaced to the user as a visible chat message.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed: connect failure, dropped
    /// connection, or timeout. Includes mid-stream transport failures.
    #[error("network error, check your connection ({0})")]
    Network(String),

    /// The server answered with a non-OK status.
    #[error("{message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message from the response body's `error` field, or a
        /// generic fallback.
        message: String,
    },

    /// The server answered OK but the body was not the expected shape.
    #[error("unexpected server response: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Wrap a transport-level failure.
    pub(crate) fn network(err: &reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_message_only() {
        let err = ClientError::Server {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "rate limited");
    }

    #[test]
    fn test_network_error_display() {
        let err = ClientError::Network("connection refused".to_string());
        assert!(err.to_string().contains("network error"));
        assert!(err.to_string().contains("connection refused"));
    }
}
