//! Error handling for the drift engine
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("no active strategy")]
    NoActiveStrategy,

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for engine operations
pub type Result<T> = anyhow::Result<T>;
