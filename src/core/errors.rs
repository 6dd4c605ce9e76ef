//! Error taxonomy for the validation orchestrator.
//!
//! Every failure mode the orchestrator, engines, or data model can produce is
//! represented here as a single `thiserror`-derived enum so callers can match
//! on structured variants instead of parsing strings.

use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Comprehensive error type for all orchestrator operations.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A `Codebase` failed structural validation.
    #[error("invalid codebase: {message}")]
    InvalidCodebase {
        /// Description of the violated invariant.
        message: String,
    },

    /// A config referenced an engine name not present in the registry.
    #[error("unknown engine: {name}")]
    UnknownEngine {
        /// The unregistered engine name.
        name: String,
    },

    /// Submission was attempted while the orchestrator was not running.
    #[error("orchestrator is not running")]
    NotRunning,

    /// Submission was attempted while the task queue was at capacity.
    #[error("task queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// A single engine invocation failed; never aborts sibling engines.
    #[error("engine '{engine}' failed: {message}")]
    EngineError {
        /// Name of the engine that failed.
        engine: String,
        /// Description of the failure.
        message: String,
    },

    /// The task-scoped context's deadline elapsed before all engines returned.
    #[error("task timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    TaskTimeout {
        /// Wall-clock time elapsed before the deadline fired.
        elapsed_ms: u64,
        /// Configured timeout budget.
        budget_ms: u64,
    },

    /// Task was terminated by an external cancellation signal.
    #[error("task cancelled")]
    Cancelled,

    /// Violation of an internal invariant (e.g. registry mutated post-startup).
    #[error("fatal internal error: {message}")]
    Fatal {
        /// Description of the invariant violation.
        message: String,
    },

    /// A requested task id was not present in the result store.
    #[error("task not found: {id}")]
    NotFound {
        /// The task id that was looked up.
        id: String,
    },

    /// I/O related errors (scratch directories, file reads, subprocess spawn).
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Configuration errors (invalid weights, non-positive timeouts, ...).
    #[error("configuration error: {message}")]
    Config {
        /// Error description.
        message: String,
        /// Configuration field that caused the error, if known.
        field: Option<String>,
    },

    /// Serialization/deserialization errors.
    #[error("serialization error: {message}")]
    Serialization {
        /// Error description.
        message: String,
    },
}

impl ValidationError {
    /// Build an [`InvalidCodebase`](Self::InvalidCodebase) error.
    pub fn invalid_codebase(message: impl Into<String>) -> Self {
        Self::InvalidCodebase {
            message: message.into(),
        }
    }

    /// Build an [`UnknownEngine`](Self::UnknownEngine) error.
    pub fn unknown_engine(name: impl Into<String>) -> Self {
        Self::UnknownEngine { name: name.into() }
    }

    /// Build an [`EngineError`](Self::EngineError) error.
    pub fn engine_error(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineError {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Build a [`Config`](Self::Config) error without a specific field.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Build a [`Config`](Self::Config) error anchored at a specific field.
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Build a [`Fatal`](Self::Fatal) error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Build an [`Io`](Self::Io) error with context.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}

impl From<io::Error> for ValidationError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON error: {err}"),
        }
    }
}

impl From<serde_yaml::Error> for ValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML error: {err}"),
        }
    }
}

/// Extension trait for attaching static context to a foreign error.
pub trait ResultExt<T> {
    /// Wrap the error with additional context, preserving the original message.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ValidationError>,
{
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            ValidationError::fatal(format!("{msg}: {inner}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_produce_expected_variants() {
        assert!(matches!(
            ValidationError::invalid_codebase("no files"),
            ValidationError::InvalidCodebase { .. }
        ));
        assert!(matches!(
            ValidationError::unknown_engine("bogus"),
            ValidationError::UnknownEngine { .. }
        ));
        assert!(matches!(
            ValidationError::engine_error("static", "boom"),
            ValidationError::EngineError { .. }
        ));
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: ValidationError = io_err.into();
        assert!(matches!(err, ValidationError::Io { .. }));
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = ValidationError::QueueFull { capacity: 100 };
        assert_eq!(err.to_string(), "task queue is full (capacity 100)");
    }
}
