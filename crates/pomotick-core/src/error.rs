//! Core error types for pomotick-core.
//!
//! The countdown engine itself never returns these for expected failures
//! (network errors, unreadable local state). They surface from the
//! collaborators and are turned into notifications or log lines at the
//! edges.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomotick-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings store (HTTP) errors
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    /// Local persistence errors
    #[error("Local persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The session driver has stopped and no longer accepts actions
    #[error("timer session has stopped")]
    SessionClosed,

    /// An operation needs the settings store but no session token is set
    #[error("no session token configured (set server.session_token with `pomotick config set`)")]
    NoIdentity,
}

/// Errors talking to the server-side settings store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport failure, timeout or undecodable body
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body does not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Server answered 2xx but reported `ok: false`
    #[error("server rejected the request: {0}")]
    Rejected(String),

    /// The configured base URL cannot be joined with an endpoint path
    #[error("invalid settings store URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from a local key-value backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Could not determine the data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
