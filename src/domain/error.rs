use std::io;

use thiserror::Error;

/// Library-wide error type for safe-output compilation.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Configuration or environment issue not tied to a single output kind.
    #[error("{0}")]
    Configuration(String),

    /// A kind's configuration is missing a required field or carries a malformed value.
    #[error("safe-outputs.{kind}: {reason}")]
    InvalidConfig { kind: String, reason: String },

    /// `target-repo` was set to the bare wildcard.
    #[error("safe-outputs.{kind}: target-repo \"*\" is not allowed, use an explicit owner/repo slug")]
    WildcardTargetRepo { kind: String },

    /// A flag that may only be `true` when present was supplied as `false`.
    #[error("safe-outputs.{kind}: '{flag}' can only be enabled; remove it instead of setting it to false")]
    ContradictoryFlag { kind: String, flag: String },

    /// The kind cannot act on the requested target.
    #[error("safe-outputs.{kind}: target '{target}' is not supported: {reason}")]
    UnsupportedTarget { kind: String, target: String, reason: String },

    /// The safe-outputs block names a kind that does not exist.
    #[error("Unknown safe-output kind '{name}'. Available: {available}")]
    UnknownKind { name: String, available: String },

    /// Two jobs were registered under the same name.
    #[error("Duplicate job '{0}' in job graph")]
    DuplicateJob(String),

    /// A job needs a job that is neither emitted nor external.
    #[error("Job '{job}' needs unknown job '{dependency}'")]
    MissingDependency { job: String, dependency: String },

    /// Circular dependency detected between jobs.
    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    /// No pinned reference exists for an action.
    #[error("No action pin for '{0}'")]
    UnknownAction(String),

    /// Parse error.
    #[error("Failed to parse {what}: {details}")]
    ParseError { what: String, details: String },

    /// Embedded asset or template failure.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    pub fn invalid_config<K: Into<String>, R: Into<String>>(kind: K, reason: R) -> Self {
        AppError::InvalidConfig { kind: kind.into(), reason: reason.into() }
    }

    /// Provide an `io::ErrorKind`-like view for callers mapping errors to exit codes.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            AppError::Io(err) => err.kind(),
            AppError::Configuration(_)
            | AppError::InvalidConfig { .. }
            | AppError::WildcardTargetRepo { .. }
            | AppError::ContradictoryFlag { .. }
            | AppError::UnsupportedTarget { .. }
            | AppError::DuplicateJob(_)
            | AppError::MissingDependency { .. }
            | AppError::CircularDependency(_)
            | AppError::ParseError { .. } => io::ErrorKind::InvalidInput,
            AppError::UnknownKind { .. } | AppError::UnknownAction(_) => io::ErrorKind::NotFound,
            AppError::InternalError(_) => io::ErrorKind::Other,
        }
    }
}
