//! Error types for Imagine Chat.

use thiserror::Error;

/// A shared error type for the entire Imagine Chat workspace.
///
/// Caller errors (`DuplicateSession`, `DuplicateAgent`, `SessionClosed`,
/// `SessionNotFound`) are surfaced immediately. Collaborator errors
/// (`Generation`, `Suggestion`, `Persistence`) are recovered locally and
/// never abort a running conversation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImagineError {
    /// A session with the same id is already registered
    #[error("Session already exists: '{id}'")]
    DuplicateSession { id: String },

    /// A participant with the same name is already part of the chat
    #[error("Participant already in the chat: '{name}'")]
    DuplicateAgent { name: String },

    /// The session no longer accepts messages
    #[error("Session is closed: '{id}'")]
    SessionClosed { id: String },

    /// No live session is registered under this id
    #[error("Session not found: '{id}'")]
    SessionNotFound { id: String },

    /// The text-generation collaborator failed or returned nothing usable
    #[error("Generation error: {0}")]
    Generation(String),

    /// The character-suggestion collaborator failed
    #[error("Suggestion error: {0}")]
    Suggestion(String),

    /// Saving a transcript failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImagineError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a DuplicateSession error
    pub fn duplicate_session(id: impl Into<String>) -> Self {
        Self::DuplicateSession { id: id.into() }
    }

    /// Creates a DuplicateAgent error
    pub fn duplicate_agent(name: impl Into<String>) -> Self {
        Self::DuplicateAgent { name: name.into() }
    }

    /// Creates a SessionClosed error
    pub fn session_closed(id: impl Into<String>) -> Self {
        Self::SessionClosed { id: id.into() }
    }

    /// Creates a SessionNotFound error
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { id: id.into() }
    }

    /// Creates a Generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Creates a Suggestion error
    pub fn suggestion(message: impl Into<String>) -> Self {
        Self::Suggestion(message.into())
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
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

    /// Check if this error means the session stopped receiving
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::SessionClosed { .. })
    }

    /// Check if this is a SessionNotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound { .. })
    }

    /// Check if this error came from an upstream collaborator.
    ///
    /// Recoverable errors are reported to the user as notices while the
    /// conversation continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Generation(_) | Self::Suggestion(_) | Self::Persistence(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ImagineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ImagineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ImagineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ImagineError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (for collaborators built on anyhow)
impl From<anyhow::Error> for ImagineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ImagineError>`.
pub type Result<T> = std::result::Result<T, ImagineError>;
