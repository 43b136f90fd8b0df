//! HTTP transport configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HttpError, HttpResult};

/// Configuration for [`HttpBackend`](crate::HttpBackend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    /// Service base URL
    pub base_url: String,

    /// Liveness endpoint path
    pub health_path: String,

    /// Document analysis endpoint path
    pub interpret_path: String,

    /// Timeout for one health check request
    pub probe_timeout: Duration,

    /// Timeout for one document submission request
    ///
    /// The first analysis after a cold start can take minutes.
    pub submission_timeout: Duration,

    /// User agent string (set to None to send reqwest's default)
    ///
    /// Default: `hemoscan/{version}`
    pub user_agent: Option<String>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            health_path: "/health".to_string(),
            interpret_path: "/interpret".to_string(),
            probe_timeout: Duration::from_secs(10),
            submission_timeout: Duration::from_secs(300),
            user_agent: Some(format!("hemoscan/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

impl HttpBackendConfig {
    /// Default configuration pointing at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Parsed base URL
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if `base_url` does not parse, or
    /// [`HttpError::MissingHost`] if it has no host.
    pub fn base(&self) -> HttpResult<Url> {
        let url = Url::parse(&self.base_url).map_err(|source| HttpError::InvalidUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(HttpError::MissingHost(self.base_url.clone()));
        }
        Ok(url)
    }

    /// Absolute URL of the liveness endpoint
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if the URL cannot be formed.
    pub fn health_url(&self) -> HttpResult<Url> {
        self.endpoint(&self.health_path)
    }

    /// Absolute URL of the analysis endpoint
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] if the URL cannot be formed.
    pub fn interpret_url(&self) -> HttpResult<Url> {
        self.endpoint(&self.interpret_path)
    }

    /// Check that URLs form and timeouts are usable
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> HttpResult<()> {
        self.health_url()?;
        self.interpret_url()?;
        if self.probe_timeout.is_zero() || self.submission_timeout.is_zero() {
            return Err(HttpError::InvalidConfiguration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> HttpResult<Url> {
        // Joining "/health" onto "http://host/api" would drop "/api"
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let url = Url::parse(&joined).map_err(|source| HttpError::InvalidUrl {
            url: joined.clone(),
            source,
        })?;
        if url.host_str().is_none() {
            return Err(HttpError::MissingHost(self.base_url.clone()));
        }
        Ok(url)
    }
}

/// Configuration for [`ReachabilityMonitor`](crate::ReachabilityMonitor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
    /// Time between connection checks
    pub interval: Duration,
    /// Bound on each TCP connect
    pub connect_timeout: Duration,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }
}
