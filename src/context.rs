use chrono::{DateTime, Utc};

use crate::config::AgentConfig;

pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// State built once at startup and shared with every component.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub config: AgentConfig,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
}

impl AgentContext {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            version: AGENT_VERSION,
            started_at: Utc::now(),
        }
    }

    pub fn user_agent(&self) -> String {
        format!("kaipo-agent/{}", self.version)
    }

    /// Whole seconds since the context was built
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}
