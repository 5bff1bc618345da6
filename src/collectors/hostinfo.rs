//! Host identity
//!
//! Hostname, OS, architecture and uptime come from sysinfo; the public IP is
//! asked from a list of echo services, first valid answer wins.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;

use crate::collectors::{Collector, CollectorOutput};
use crate::context::AgentContext;
use crate::error::CollectorError;

pub const PUBLIC_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://icanhazip.com",
    "https://ifconfig.me",
    "https://checkip.amazonaws.com",
];

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub public_ip: String,
    pub os: String,
    pub arch: String,
    /// Seconds since boot
    pub uptime: u64,
}

pub struct HostInfoCollector {
    ctx: Arc<AgentContext>,
    client: reqwest::Client,
    services: Vec<String>,
}

impl HostInfoCollector {
    pub fn new(ctx: Arc<AgentContext>) -> Result<Self, CollectorError> {
        let services = PUBLIC_IP_SERVICES.iter().map(|s| s.to_string()).collect();
        Self::with_services(ctx, services)
    }

    pub fn with_services(
        ctx: Arc<AgentContext>,
        services: Vec<String>,
    ) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(PUBLIC_IP_TIMEOUT)
            .user_agent(ctx.user_agent())
            .build()
            .map_err(|e| CollectorError::Unavailable {
                collector: "hostinfo",
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            ctx,
            client,
            services,
        })
    }

    fn hostname(&self) -> Result<String, CollectorError> {
        if let Some(name) = self.ctx.config.hostname.as_ref().filter(|h| !h.is_empty()) {
            return Ok(name.clone());
        }
        System::host_name()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CollectorError::Unavailable {
                collector: "hostinfo",
                message: "failed to get hostname".to_string(),
            })
    }

    async fn public_ip(&self) -> Option<String> {
        for service in &self.services {
            match self.fetch_ip(service).await {
                Ok(ip) => return Some(ip),
                Err(e) => debug!("Public IP lookup via {} failed: {}", service, e),
            }
        }
        None
    }

    async fn fetch_ip(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP status: {}", status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        parse_ip_response(&body).ok_or_else(|| format!("invalid IP address: {}", body.trim()))
    }
}

/// Accepts a bare IPv4/IPv6 address, surrounding whitespace allowed.
pub fn parse_ip_response(body: &str) -> Option<String> {
    body.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

#[async_trait]
impl Collector for HostInfoCollector {
    fn name(&self) -> &str {
        "hostinfo"
    }

    async fn collect(&self) -> Result<CollectorOutput, CollectorError> {
        let hostname = self.hostname()?;

        let public_ip = match self.public_ip().await {
            Some(ip) => ip,
            None => {
                warn!("Failed to get public IP: all lookup services failed");
                String::new()
            }
        };

        let info = HostInfo {
            hostname,
            public_ip,
            os: System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string()),
            arch: std::env::consts::ARCH.to_string(),
            uptime: System::uptime(),
        };

        info!("Host info: hostname={}, ip={}", info.hostname, info.public_ip);
        Ok(CollectorOutput::HostInfo(info))
    }
}
