//! Authenticated HTTPS report submission

use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

use crate::config::normalize_server_url;
use crate::context::AgentContext;
use crate::error::SubmitError;
use crate::reporter::payload::{ReportPayload, ServerDirective};

/// Path appended to the normalized server URL
pub const REPORT_PATH: &str = "/api/agent/report";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can deliver a report and return the server's directive.
///
/// Implementations must not touch scheduler or sampler state.
#[async_trait]
pub trait ReportSubmitter: Send + Sync {
    async fn submit(&self, payload: &ReportPayload) -> Result<ServerDirective, SubmitError>;
}

#[derive(Debug, Clone)]
pub struct ReportClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user_agent: String,
}

impl ReportClient {
    pub fn new(ctx: &AgentContext) -> Result<Self, SubmitError> {
        Self::with_timeout(ctx, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(ctx: &AgentContext, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", normalize_server_url(&ctx.config.server_url), REPORT_PATH),
            token: ctx.config.token.clone(),
            user_agent: ctx.user_agent(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: Vec<u8>) -> Result<(StatusCode, String), SubmitError> {
        debug!("Sending request to: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(USER_AGENT, &self.user_agent)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("Response status: {}", status.as_u16());
        Ok((status, text))
    }

    /// Sends an empty report; 200, 400 and 401 all prove the server is reachable.
    pub async fn test_connection(&self) -> Result<u16, SubmitError> {
        info!("Testing connection to server: {}", self.endpoint);
        let (status, body) = self.post(b"{}".to_vec()).await?;

        match status {
            StatusCode::OK | StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                info!("Connection test successful (server is reachable)");
                Ok(status.as_u16())
            }
            other => Err(SubmitError::Transient {
                status: other.as_u16(),
                body,
            }),
        }
    }
}

#[async_trait]
impl ReportSubmitter for ReportClient {
    async fn submit(&self, payload: &ReportPayload) -> Result<ServerDirective, SubmitError> {
        info!(
            "Reporting to server: {} ({} SSH log entries)",
            self.endpoint,
            payload.ssh_logins.as_ref().map_or(0, Vec::len)
        );

        let body = serde_json::to_vec(payload)?;
        let (status, text) = self.post(body).await?;
        let directive = classify_response(status.as_u16(), &text)?;

        info!(
            "Report successful. Server interval: {} seconds",
            directive.report_interval.unwrap_or_default()
        );
        Ok(directive)
    }
}

/// Maps an HTTP status and body to a directive or a submission error class.
pub fn classify_response(status: u16, body: &str) -> Result<ServerDirective, SubmitError> {
    match status {
        401 => Err(SubmitError::Unauthorized),
        200 => Ok(serde_json::from_str(body)?),
        _ => Err(SubmitError::Transient {
            status,
            body: body.trim().to_string(),
        }),
    }
}
