//! Error types for breathe-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//! Cancellation of a run is control flow and never surfaces as an error.

use thiserror::Error;

/// Main error type for breathe-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed plan configuration, rejected at plan construction
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Sound collaborator failure (logged, never aborts a run)
    #[error("Sound error: {0}")]
    Sound(String),

    /// Wake lock acquisition or release failure (non-fatal)
    #[error("Wake lock error: {0}")]
    WakeLock(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using breathe-player Error
pub type Result<T> = std::result::Result<T, Error>;
