//! Error types shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MonarchResult<T> = Result<T, MonarchError>;

/// Errors produced by session handling, authentication, and API calls.
#[derive(Debug, Error)]
pub enum MonarchError {
    /// No session could be loaded and no usable credentials exist.
    ///
    /// The message names the remediation so that every tool reporting it
    /// tells the user exactly what to do next.
    #[error(
        "authentication required: run the monarch-login setup utility, \
         or set MONARCH_EMAIL and MONARCH_PASSWORD in the environment"
    )]
    AuthenticationRequired,

    /// The API demanded a one-time code to complete this login.
    ///
    /// Handled inside the login flow; tool callers never see it directly.
    #[error("Monarch Money requires a multi-factor authentication code for this login")]
    MfaRequired,

    /// A candidate session file exists but could not be read or parsed.
    #[error("failed to load session from {}: {reason}", path.display())]
    SessionLoad {
        /// Path of the offending candidate.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// The HTTP request itself failed (connection, TLS, timeout).
    #[error("request to the Monarch API failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success HTTP status.
    #[error("Monarch API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The GraphQL envelope carried an `errors` array.
    #[error("Monarch API reported an error: {0}")]
    GraphQl(String),

    /// A caller-supplied date parameter was not `YYYY-MM-DD`.
    #[error("invalid date '{value}': {reason}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// JSON (de)serialization failed.
    #[error("failed to serialize or deserialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
