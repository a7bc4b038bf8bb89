//! Error types for isomarch

use thiserror::Error;

/// Main error type for isomarch operations
///
/// Every invocation is all-or-nothing: configuration errors are raised before
/// any parallel work starts, and internal failures never leave partially
/// written outputs behind.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for isomarch operations
pub type Result<T> = std::result::Result<T, Error>;
