//! Core error types for the Kinema engine.
//!
//! All engine errors are local and synchronous: they surface at the call
//! that triggers them (construction or first evaluation) and are never
//! retried. A detected cycle or illegal write is a caller programming
//! error, not a transient condition.

/// A specialized Result type for Kinema operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error type encompassing all Kinema subsystems.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Direct write to a derived signal.
    #[error("illegal write: {0}")]
    IllegalWrite(String),

    /// A derivation transitively depends on itself.
    #[error("dependency cycle: {0}")]
    DependencyCycle(String),

    /// Adding a node as its own descendant.
    #[error("tree cycle: {0}")]
    TreeCycle(String),

    /// Interpolating across incompatible value kinds, or otherwise
    /// malformed caller input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A parent-relative property was resolved before attachment.
    #[error("unattached node: {0}")]
    Unattached(String),

    /// Invalid playback configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Timeline driver failure (e.g. the run-to-completion tick cap).
    #[error("timeline error: {0}")]
    Timeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl EngineError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        EngineError::InvalidInput(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }
}
