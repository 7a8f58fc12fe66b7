//! Common error types for SkillForge

use thiserror::Error;

/// Common result type for SkillForge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the SkillForge services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request carries no usable learner identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Identity is known but lacks the role the operation requires
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation requires state the caller has not reached
    /// (e.g. claiming a reward before the program is completed)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Room transport failure (client side, never surfaced over HTTP)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
