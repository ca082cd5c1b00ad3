//! Error types for the hometrain workspace.

use thiserror::Error;

/// A shared error type for the entire hometrain workspace.
///
/// Variants follow the taxonomy the session core reasons about: transient
/// network failures are the only retryable class, validation and conflict
/// errors are surfaced without retry, and expired credentials are propagated
/// untouched to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HomeTrainError {
    /// Connection failure, timeout, throttling or a 5xx answer.
    #[error("Transient network error: {message}")]
    TransientNetwork { message: String },

    /// Malformed plan, outcome or index. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request does not fit the current state (e.g. an exercise index
    /// beyond the plan length).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The bearer token was rejected by the remote store.
    #[error("Authentication expired")]
    AuthExpired,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Another write for the same resource is still in flight.
    #[error("Resource busy: {resource}")]
    Busy { resource: String },

    /// The lifecycle state machine refused a transition.
    #[error("Invalid transition: {event} is not allowed in state {from}")]
    InvalidTransition { from: String, event: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Non-retryable answer from the remote store.
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HomeTrainError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a TransientNetwork error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Busy error
    pub fn busy(resource: impl Into<String>) -> Self {
        Self::Busy {
            resource: resource.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Only transient network failures may be retried, and only for
    /// idempotent operations.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if this is a Busy error
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for HomeTrainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for HomeTrainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HomeTrainError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for HomeTrainError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, HomeTrainError>`.
pub type Result<T> = std::result::Result<T, HomeTrainError>;
