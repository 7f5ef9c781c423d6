//! Error handling for folio
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Core error types for snapshot processing
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("pricing error: {0}")]
    PricingError(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// Result type alias for snapshot operations
pub type Result<T> = anyhow::Result<T>;
