//! Error types for mlflow-wrapper
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error code the tracking server uses for missing experiments, runs and artifacts.
pub const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

/// mlflow-wrapper error types
#[derive(Error, Debug)]
pub enum Error {
    /// Requested experiment or run is absent and creation was disallowed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Mutually exclusive or required arguments not satisfied
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Metric value could not be read as a number during extremum search
    #[error("Metric '{metric}' has non-numeric value {value}")]
    Conversion {
        /// Metric name
        metric: String,
        /// Raw value as delivered by the tracking service
        value: String,
    },

    /// Tracking service rejected the request
    #[error("Tracking service error ({status}): {error_code}: {message}")]
    Service {
        /// HTTP status code (404 for missing resources in the memory backend)
        status: u16,
        /// Service error code, e.g. `RESOURCE_DOES_NOT_EXIST`
        error_code: String,
        /// Human-readable message from the service
        message: String,
    },

    /// Transport error talking to the tracking service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow/CSV error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Build a `RESOURCE_DOES_NOT_EXIST` service error.
    pub fn resource_missing(message: impl Into<String>) -> Self {
        Self::Service {
            status: 404,
            error_code: RESOURCE_DOES_NOT_EXIST.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error means the requested entity does not exist,
    /// locally or on the tracking server.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Service { error_code, .. } => error_code == RESOURCE_DOES_NOT_EXIST,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
