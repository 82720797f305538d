//! Error types for rety operations

/// Result type for rety operations
pub type Result<T> = std::result::Result<T, RetyError>;

/// Error types for recording and replay
#[derive(Debug, thiserror::Error)]
pub enum RetyError {
    /// An action addressed an editor id the router does not know
    #[error("Unknown editor \"{id}\". Known editors: {known}")]
    UnknownEditor {
        /// The id named by the action
        id: String,
        /// Comma-separated list of registered ids
        known: String,
    },

    /// `resume()` was called with no installed queue
    #[error("Nothing to resume")]
    NothingToResume,

    /// A log payload failed to parse or validate
    #[error("Malformed action log: {0}")]
    MalformedLog(String),

    /// A registered custom action handler failed
    #[error("Custom action \"{kind}\" failed: {message}")]
    CustomAction {
        /// Action type the handler was registered for
        kind: String,
        /// Handler error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RetyError {
    /// Shorthand for a malformed-log error
    pub fn malformed(message: impl Into<String>) -> Self {
        RetyError::MalformedLog(message.into())
    }
}
