//! Structured error types for the retrieval engine
//!
//! Provides machine-readable error codes alongside human-readable messages.
//! The engine itself never surfaces these to an end user; failure modes
//! manifest as degraded (less complete or less fresh) search results.

use std::fmt;

/// Retrieval engine error types with proper categorization
#[derive(Debug)]
pub enum MemoryError {
    /// Embedding provider call failed or returned malformed output
    Provider { reason: String },

    /// Durable store unreachable or failed during a load
    StoreRead { reason: String },

    /// A suspension point exceeded its configured deadline
    Timeout {
        operation: &'static str,
        limit_ms: u64,
    },

    /// Internal invariant violation - unreachable in a correct
    /// implementation, treated as a fatal bug if observed
    IndexInconsistency { details: String },

    /// Caller-supplied input failed validation
    InvalidInput { field: String, reason: String },

    /// Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl MemoryError {
    /// Get error code for programmatic identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::Provider { .. } => "PROVIDER_ERROR",
            Self::StoreRead { .. } => "STORE_READ_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::IndexInconsistency { .. } => "INDEX_INCONSISTENCY",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::Provider { reason } => format!("Embedding provider error: {reason}"),
            Self::StoreRead { reason } => format!("Durable store read error: {reason}"),
            Self::Timeout {
                operation,
                limit_ms,
            } => format!("Operation '{operation}' timed out after {limit_ms}ms"),
            Self::IndexInconsistency { details } => {
                format!("Index inconsistency detected: {details}")
            }
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Whether the error is transient and worth one retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::StoreRead { .. } | Self::Timeout { .. }
        )
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MemoryError {}

/// Convert from anyhow::Error to MemoryError
impl From<anyhow::Error> for MemoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Type alias for Results using MemoryError
pub type Result<T> = std::result::Result<T, MemoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MemoryError::Provider {
                reason: "connection refused".to_string()
            }
            .code(),
            "PROVIDER_ERROR"
        );
        assert_eq!(
            MemoryError::StoreRead {
                reason: "unreachable".to_string()
            }
            .code(),
            "STORE_READ_ERROR"
        );
        assert_eq!(
            MemoryError::IndexInconsistency {
                details: "dangling id".to_string()
            }
            .code(),
            "INDEX_INCONSISTENCY"
        );
    }

    #[test]
    fn test_timeout_message_includes_operation() {
        let err = MemoryError::Timeout {
            operation: "embed_batch",
            limit_ms: 1500,
        };
        assert!(err.message().contains("embed_batch"));
        assert!(err.message().contains("1500"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(MemoryError::Provider {
            reason: "503".to_string()
        }
        .is_retryable());
        assert!(!MemoryError::IndexInconsistency {
            details: "bug".to_string()
        }
        .is_retryable());
    }
}
