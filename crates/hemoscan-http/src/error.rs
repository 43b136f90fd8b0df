//! Errors raised while setting up the HTTP transport
//!
//! Per-request failures never use this type; they are classified into
//! [`OperationFailure`](hemoscan_resilience::OperationFailure) at the boundary.

use thiserror::Error;

/// Result type for HTTP transport setup
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// HTTP transport setup errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// The base URL or an endpoint path does not form a valid URL
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// The base URL has no host to connect to
    #[error("URL '{0}' has no host")]
    MissingHost(String),

    /// The underlying reqwest client could not be built
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
