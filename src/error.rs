// src/error.rs - Error types for configuration, classification and sessions
use thiserror::Error;

/// Errors raised while loading or validating a [`crate::config::RecognizerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A knob has a value the engine cannot run with.
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter {
        /// Field name as it appears in the JSON config
        name: &'static str,
        /// What is wrong with it
        message: String,
    },

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

/// Errors surfaced by a [`crate::classifier::SignClassifier`].
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    /// Input window does not have the shape the model expects.
    #[error("Input shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The model could not be loaded or is not ready.
    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    /// The model ran but failed to produce scores.
    #[error("Inference error: {0}")]
    Inference(String),
}

/// Errors from the asynchronous recognition session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Recognition session is closed")]
    Closed,

    #[error("Session task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ClassifierResult<T> = std::result::Result<T, ClassifierError>;
