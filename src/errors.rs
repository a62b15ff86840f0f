//! Application error model
//!
//! Defines a typed error hierarchy using `thiserror`. Errors below the run
//! level (per-folder, per-message) are caught at the point of occurrence and
//! converted into recorded sync outcomes; only setup-phase errors propagate
//! out of `main` as a failing exit.

use thiserror::Error;

/// Application error type
///
/// Covers all error cases the sync tool may encounter.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration or user input (validation failed, malformed value)
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Resource not found (mailbox folder, message)
    #[error("not found: {0}")]
    NotFound(String),
    /// Authentication failure (bad credentials, account disabled)
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// Operation timeout (TCP connect, TLS handshake, IMAP response)
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;
