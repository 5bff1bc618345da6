//! Kaipo Agent
//!
//! Host telemetry agent: collects SSH login activity, load averages, host
//! identity and delta-sampled network traffic, and reports them to a remote
//! collector on a server-negotiated interval.

pub mod cli;
pub mod collectors;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod reporter;
pub mod runtime;

pub use config::AgentConfig;
pub use context::AgentContext;
pub use error::{AgentError, CollectorError, ConfigError, SubmitError};
