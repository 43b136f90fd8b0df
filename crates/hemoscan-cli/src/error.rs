//! CLI error types with user-facing guidance

use std::fmt;
use std::path::PathBuf;

use hemoscan_http::HttpError;
use hemoscan_resilience::ResilienceError;
use hemoscan_telemetry::TelemetryError;
use thiserror::Error;

/// Status the service uses when it cannot interpret a report
const UNPROCESSABLE: u16 = 422;

/// CLI errors with rich context
#[derive(Error, Debug)]
pub enum CliError {
    /// The resilience layer gave up or the service rejected the request
    #[error(transparent)]
    Resilience(#[from] ResilienceError),

    /// HTTP transport could not be set up
    #[error("HTTP setup error: {0}")]
    Http(#[from] HttpError),

    /// Logging could not be initialized
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document could not be read
    #[error("Cannot read {}: {source}", path.display())]
    ReadDocument {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid command arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// The message to show the user
    ///
    /// Resilience errors use their user-facing text; everything else uses the
    /// error's display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Resilience(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// Likely causes, when they can be told from the error
    pub fn causes(&self) -> Vec<&'static str> {
        match self {
            Self::Resilience(ResilienceError::Fatal {
                status: Some(UNPROCESSABLE),
                ..
            }) => vec![
                "The exam type may not be supported yet; only blood counts (hemograma) are accepted",
                "The PDF is corrupted or uses an unsupported layout",
                "The report text is illegible, heavily distorted, or only an image",
                "The file does not contain laboratory results",
            ],
            Self::Resilience(err) if err.is_connectivity_related() => vec![
                "The analysis server is offline or still starting up",
                "The network connection is unavailable",
            ],
            _ => vec![],
        }
    }

    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Resilience(ResilienceError::Fatal {
                status: Some(UNPROCESSABLE),
                ..
            }) => vec![
                "Check that the report is a supported type: blood count, coagulation, or basic biochemistry",
                "Try another PDF, or export the report again at better quality",
                "Make sure the PDF has selectable text, not only images",
            ],
            Self::Resilience(err) if err.is_connectivity_related() => vec![
                "Run `hemoscan watch` to wait for the server to come back",
                "Verify the service URL with --url or HEMOSCAN_BASE_URL",
            ],
            Self::Resilience(ResilienceError::SchedulerSuspended { .. }) => vec![
                "Run `hemoscan status` to check again manually",
                "Check the server logs for startup errors",
            ],
            Self::Http(_) => vec!["Check the service URL format, e.g. http://localhost:8000"],
            Self::Config(_) => vec![
                "Check the config file syntax (TOML)",
                "Durations are given in milliseconds in *_ms keys",
            ],
            Self::ReadDocument { .. } => vec!["Check that the file exists and is readable"],
            Self::InvalidArguments(_) => vec!["Use --help to see expected arguments"],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Resilience(err) if err.is_connectivity_related() => ErrorCategory::Connection,
            Self::Resilience(ResilienceError::SchedulerSuspended { .. }) => ErrorCategory::Connection,
            Self::Resilience(ResilienceError::Fatal { .. }) => ErrorCategory::Server,
            Self::Resilience(ResilienceError::Cancelled { .. }) => ErrorCategory::Cancelled,
            Self::Resilience(ResilienceError::InvalidConfiguration(_))
            | Self::Config(_)
            | Self::Http(_)
            | Self::Telemetry(_) => ErrorCategory::Config,
            Self::ReadDocument { .. } | Self::InvalidArguments(_) => ErrorCategory::User,
            Self::Json(_) | Self::Io(_) => ErrorCategory::System,
            _ => ErrorCategory::Other,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Server unreachable or not responding
    Connection,
    /// The server rejected the request
    Server,
    /// Bad input from the user
    User,
    /// Bad configuration
    Config,
    /// Interrupted by the user
    Cancelled,
    /// Local system failure
    System,
    /// Anything else
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::Server => write!(f, "Server"),
            Self::User => write!(f, "User Input"),
            Self::Config => write!(f, "Configuration"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::System => write!(f, "System"),
            Self::Other => write!(f, "Error"),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
