//! Tracking client configuration
//!
//! The default server address is a fallback, not a contract: callers either
//! build a [`ClientConfig`] explicitly or read the usual `MLFLOW_*`
//! environment variables with [`ClientConfig::from_env`].

use std::time::Duration;

use crate::{Error, Result};

/// Fallback tracking server address
pub const DEFAULT_TRACKING_URI: &str = "http://127.0.0.1:5000";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for [`RestTrackingClient`](crate::tracking::RestTrackingClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    tracking_uri: String,
    timeout: Duration,
    token: Option<String>,
}

impl ClientConfig {
    /// Create a config for the given tracking URI with default settings
    #[must_use]
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }

    /// Create a config builder
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read `MLFLOW_TRACKING_URI`, `MLFLOW_HTTP_REQUEST_TIMEOUT` (seconds)
    /// and `MLFLOW_TRACKING_TOKEN`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the resulting tracking URI is empty
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(uri) = std::env::var("MLFLOW_TRACKING_URI") {
            builder = builder.tracking_uri(uri);
        }

        if let Some(timeout) = std::env::var("MLFLOW_HTTP_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Ok(token) = std::env::var("MLFLOW_TRACKING_TOKEN") {
            builder = builder.token(token);
        }

        builder.build()
    }

    /// Tracking server base URI, without trailing slash
    #[must_use]
    pub fn tracking_uri(&self) -> &str {
        &self.tracking_uri
    }

    /// Per-request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bearer token, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TRACKING_URI)
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    tracking_uri: String,
    timeout: Duration,
    token: Option<String>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            tracking_uri: DEFAULT_TRACKING_URI.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }
}

impl ClientConfigBuilder {
    /// Set the tracking server URI
    #[must_use]
    pub fn tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = uri.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a bearer token sent with every request
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build the config
    ///
    /// # Errors
    ///
    /// Returns error if the tracking URI is empty
    pub fn build(self) -> Result<ClientConfig> {
        let tracking_uri = self.tracking_uri.trim().trim_end_matches('/').to_string();
        if tracking_uri.is_empty() {
            return Err(Error::Config("tracking URI must not be empty".to_string()));
        }

        Ok(ClientConfig {
            tracking_uri,
            timeout: self.timeout,
            token: self.token.filter(|t| !t.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.tracking_uri(), DEFAULT_TRACKING_URI);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.token().is_none());
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let config = ClientConfig::builder()
            .tracking_uri("http://mlflow.local:5000/")
            .timeout(Duration::from_secs(5))
            .token("secret")
            .build()
            .unwrap();

        assert_eq!(config.tracking_uri(), "http://mlflow.local:5000");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.token(), Some("secret"));
    }

    #[test]
    fn test_builder_rejects_empty_uri() {
        let result = ClientConfig::builder().tracking_uri("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
