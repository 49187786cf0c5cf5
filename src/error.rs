//! Error types for the matchmaking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("User '{user_id}' already has a live queue entry")]
    QueueConflict { user_id: String },

    #[error("No question available for the matched preferences: {reason}")]
    QuestionUnavailable { reason: String },

    #[error("{service} returned status {status}: {message}")]
    Downstream {
        service: String,
        status: u16,
        message: String,
    },

    #[error("{service} unreachable: {message}")]
    DownstreamUnavailable { service: String, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Queue store error: {message}")]
    StoreUnavailable { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchingError {
    /// HTTP status this error maps to at the API boundary.
    ///
    /// Downstream failures pass their original status through verbatim;
    /// transport-level failures collapse to 500, and an exhausted question
    /// lookup is a retryable 503.
    pub fn http_status(&self) -> u16 {
        match self {
            MatchingError::QueueConflict { .. } => 409,
            MatchingError::QuestionUnavailable { .. } => 503,
            MatchingError::Downstream { status, .. } => *status,
            MatchingError::Unauthorized { .. } => 401,
            MatchingError::DownstreamUnavailable { .. }
            | MatchingError::StoreUnavailable { .. }
            | MatchingError::ConfigurationError { .. }
            | MatchingError::InternalError { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_status_passthrough() {
        let err = MatchingError::Downstream {
            service: "room-service".to_string(),
            status: 422,
            message: "bad question id".to_string(),
        };
        assert_eq!(err.http_status(), 422);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = MatchingError::QueueConflict {
            user_id: "42".to_string(),
        };
        assert_eq!(err.http_status(), 409);
    }
}
