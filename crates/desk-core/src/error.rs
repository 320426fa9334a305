//! Error types for desk-core

use thiserror::Error;

/// Result type alias for desk-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// A tool invoked by an agent failed
    #[error("Tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// Supervisor configuration is invalid (duplicate or missing agent names)
    #[error("Invalid supervisor configuration: {0}")]
    InvalidConfiguration(String),
}
