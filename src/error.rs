//! Error types and handling
//!
//! Common error types used across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// The control plane could not be reached while constructing a client.
    #[error("control plane unreachable at {url}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),

    /// Every port in the pool is held by a live session.
    #[error("no free ports in range {start}-{end}")]
    PortsExhausted { start: u16, end: u16 },

    /// The control plane rejected a start/stop request.
    #[error("control plane error: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The recorder process exited before passing its health check.
    #[error("recorder failed to start: {message}")]
    Launch {
        message: String,
        /// Recorder log file, when file logging was requested.
        log_path: Option<PathBuf>,
    },

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
