//! Error types for ashare-core

use thiserror::Error;

/// Result type alias for ashare-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any work was done
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),
}
