//! Error types for the agent
//!
//! Each layer has its own error enum so that the report cycle can decide,
//! per failure class, whether to skip a source, retry a submission, or stop.

use thiserror::Error;

/// Failure of a single data source. Never aborts a report cycle.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("{collector}: unexpected data format: {message}")]
    Parse {
        collector: &'static str,
        message: String,
    },

    #[error("{collector}: {message}")]
    Unavailable {
        collector: &'static str,
        message: String,
    },
}

/// Outcome classes of a report submission that did not produce a directive.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The server rejected the bearer token (HTTP 401)
    #[error("unauthorized: invalid token")]
    Unauthorized,

    /// Any other non-200 status
    #[error("server returned error: {status} - {body}")]
    Transient { status: u16, body: String },

    /// Connection, TLS or timeout failure
    #[error("failed to send request: {0}")]
    Network(#[from] reqwest::Error),

    /// Request or response body could not be (de)serialized
    #[error("failed to encode or decode report: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SubmitError {
    /// Only an authentication failure is fatal; everything else is retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmitError::Unauthorized)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid server URL '{0}' (should start with http:// or https://)")]
    InvalidUrl(String),

    #[error("invalid token (too short, minimum {min} characters)")]
    TokenTooShort { min: usize },

    #[error("report interval must be greater than zero")]
    ZeroInterval,

    #[error("report interval of {secs} seconds exceeds the maximum of {max}")]
    IntervalTooLong { secs: u64, max: u64 },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end the agent's run loop.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid token, exiting")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}
