//! Error types for the deploy dispatcher

use thiserror::Error;

/// Main error type for the dispatcher service
#[derive(Error, Debug)]
pub enum DispatcherError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),
}
