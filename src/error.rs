//! Error types for the dispatcher, configuration, and CLI layers.
//!
//! This module defines `MdttsError`, the single error enum propagated through
//! the core dispatcher, the configuration service, and the command layer. It
//! also provides exit-code mapping and user-facing message formatting.
use thiserror::Error;

/// Represents all possible errors raised while submitting or running a batch.
///
/// # Exit Codes
///
/// Each error variant maps to an exit code via `MdttsError::exit_code`.
#[derive(Error, Debug)]
pub enum MdttsError {
    /// I/O operation failed during file system access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error due to invalid or missing settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Client-side validation failure: no batch is created.
    ///
    /// Covers missing files, an empty enabled-server list, malformed server
    /// JSON, and invalid folder names.
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what failed validation
        message: String,
    },

    /// Upstream TTS call failed at the transport level.
    #[error("Upstream request error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// A task reached its terminal state after exhausting retries, or hit an
    /// unrecoverable condition (missing source file, unreadable text).
    #[error("Task {task_id} failed: {reason}")]
    TaskTerminal {
        /// Id of the task that failed terminally
        task_id: String,
        /// Human-readable reason
        reason: String,
    },

    /// Batch-local fatal error: the dispatcher itself could not continue.
    #[error("Batch {batch_id} stopped: {reason}")]
    BatchFatal {
        /// Id of the affected batch
        batch_id: String,
        /// Human-readable reason
        reason: String,
    },

    /// The requested batch id is not known to the registry.
    #[error("Unknown batch: {0}")]
    UnknownBatch(String),

    /// Catch-all error variant wrapping any other failure.
    #[error("Unknown error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<walkdir::Error> for MdttsError {
    fn from(err: walkdir::Error) -> Self {
        MdttsError::Io(
            err.into_io_error()
                .unwrap_or_else(|| std::io::Error::other(err.to_string())),
        )
    }
}

impl From<config::ConfigError> for MdttsError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(path) => MdttsError::Config {
                message: format!("configuration file not found: {}", path),
            },
            config::ConfigError::Message(msg) => MdttsError::Config { message: msg },
            _ => MdttsError::Config {
                message: format!("configuration error: {}", err),
            },
        }
    }
}

impl From<serde_json::Error> for MdttsError {
    fn from(err: serde_json::Error) -> Self {
        MdttsError::Validation {
            message: format!("invalid JSON: {}", err),
        }
    }
}

/// Specialized `Result` type for mdtts operations.
pub type MdttsResult<T> = Result<T, MdttsError>;

impl MdttsError {
    /// Create a configuration error with the given message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        MdttsError::Config {
            message: message.into(),
        }
    }

    /// Create a validation error with the given message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        MdttsError::Validation {
            message: message.into(),
        }
    }

    /// Create a terminal task-failure error.
    pub fn task_terminal<S1: Into<String>, S2: Into<String>>(task_id: S1, reason: S2) -> Self {
        MdttsError::TaskTerminal {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a batch-fatal error.
    pub fn batch_fatal<S1: Into<String>, S2: Into<String>>(batch_id: S1, reason: S2) -> Self {
        MdttsError::BatchFatal {
            batch_id: batch_id.into(),
            reason: reason.into(),
        }
    }

    /// Return the corresponding exit code for this error variant.
    pub fn exit_code(&self) -> i32 {
        match self {
            MdttsError::Io(_) => 1,
            MdttsError::Config { .. } => 2,
            MdttsError::Validation { .. } => 3,
            MdttsError::Upstream(_) => 4,
            MdttsError::TaskTerminal { .. } => 5,
            MdttsError::BatchFatal { .. } => 6,
            MdttsError::UnknownBatch(_) => 7,
            MdttsError::Other(_) => 1,
        }
    }

    /// Return a user-friendly error message with suggested remedies.
    pub fn user_friendly_message(&self) -> String {
        match self {
            MdttsError::Io(e) => format!("File operation error: {}", e),
            MdttsError::Config { message } => format!(
                "Configuration error: {}\nHint: check your --servers file and environment variables",
                message
            ),
            MdttsError::Validation { message } => format!(
                "Invalid submission: {}\nHint: check the input directory and server list",
                message
            ),
            MdttsError::Upstream(e) => format!(
                "Upstream TTS request error: {}\nHint: check server URL and API key",
                e
            ),
            MdttsError::TaskTerminal { task_id, reason } => {
                format!("Task {} failed permanently: {}", task_id, reason)
            }
            MdttsError::BatchFatal { batch_id, reason } => {
                format!("Batch {} stopped: {}", batch_id, reason)
            }
            MdttsError::UnknownBatch(id) => format!("No such batch: {}", id),
            MdttsError::Other(err) => {
                format!("Unknown error: {}\nHint: please report this issue", err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error_creation() {
        let error = MdttsError::config("bad value");
        assert!(matches!(error, MdttsError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: bad value");
    }

    #[test]
    fn test_validation_error_creation() {
        let error = MdttsError::validation("no enabled servers");
        assert!(matches!(error, MdttsError::Validation { .. }));
        assert!(error.to_string().contains("no enabled servers"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: MdttsError = io_error.into();
        assert!(matches!(err, MdttsError::Io(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(MdttsError::config("x").exit_code(), 2);
        assert_eq!(MdttsError::validation("x").exit_code(), 3);
        assert_eq!(
            MdttsError::task_terminal("t1", "caps exhausted").exit_code(),
            5
        );
        assert_eq!(MdttsError::batch_fatal("b1", "panic").exit_code(), 6);
    }

    #[test]
    fn test_user_friendly_messages() {
        let err = MdttsError::config("missing key");
        let message = err.user_friendly_message();
        assert!(message.contains("Configuration error:"));
        assert!(message.contains("--servers"));
    }
}
