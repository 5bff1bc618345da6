use anyhow::{Context, Result, bail};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::collectors::network::SysinfoCounters;
use crate::collectors::{
    HostInfoCollector, NetworkCollector, SshCollector, SystemCollector, TrafficSampler,
};
use crate::config::AgentConfig;
use crate::context::AgentContext;
use crate::error::AgentError;
use crate::reporter::{ReportClient, ReportScheduler};
use crate::runtime::{self, PidFile};

pub struct AgentCommandHandler {
    config_path: PathBuf,
    pid_file: PidFile,
}

impl AgentCommandHandler {
    pub fn new(config_path: PathBuf, pid_file: PidFile) -> Self {
        Self {
            config_path,
            pid_file,
        }
    }

    fn load_config(&self) -> Result<AgentConfig> {
        AgentConfig::load(&self.config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })
    }

    pub async fn handle_run_command(
        &self,
        server: Option<String>,
        token: Option<String>,
    ) -> Result<()> {
        let config = self.load_config()?.with_overrides(server, token);
        config
            .validate()
            .context("Invalid configuration, run 'kaipo-agent configure' first")?;

        if let Some(pid) = self.pid_file.status()? {
            bail!("kaipo-agent is already running (PID: {})", pid);
        }
        self.pid_file.write_current().with_context(|| {
            format!("Failed to write PID file {}", self.pid_file.path().display())
        })?;

        info!("Starting kaipo-agent v{}", crate::context::AGENT_VERSION);
        info!("Server URL: {}", config.server_url);
        info!("Report interval: {} seconds", config.report_interval);

        let ctx = Arc::new(AgentContext::new(config));
        let result = run_agent(ctx.clone()).await;

        if let Err(e) = self.pid_file.remove() {
            warn!("Failed to remove PID file: {}", e);
        }
        info!("Agent stopped after {} seconds", ctx.uptime_secs());

        result.map_err(anyhow::Error::from)
    }

    pub fn handle_configure_command(
        &self,
        server: String,
        token: String,
        interval: Option<u64>,
    ) -> Result<()> {
        let mut config = self.load_config()?;
        config.server_url = server.trim().to_string();
        config.token = token.trim().to_string();
        if let Some(secs) = interval {
            config.report_interval = secs;
        }

        config.validate_for_save().context("Invalid settings")?;
        config.save(&self.config_path)?;

        println!("✅ Configuration saved to {}", self.config_path.display());
        println!("   Server:   {}", config.server_url);
        println!("   Interval: {} seconds", config.report_interval);
        Ok(())
    }

    pub fn handle_status_command(&self) -> Result<()> {
        match self.pid_file.status()? {
            Some(pid) => println!("✅ kaipo-agent is running (PID: {pid})"),
            None => println!("⏹  kaipo-agent is not running"),
        }

        match self.load_config() {
            Ok(config) if !config.server_url.is_empty() => {
                println!("   Config:   {}", self.config_path.display());
                println!("   Server:   {}", config.server_url);
                println!("   Interval: {} seconds", config.report_interval);
            }
            Ok(_) => println!("   Not configured ({})", self.config_path.display()),
            Err(e) => println!("   Configuration unreadable: {e:#}"),
        }
        Ok(())
    }

    pub fn handle_stop_command(&self) -> Result<()> {
        let pid = self
            .pid_file
            .signal_stop()
            .context("Failed to stop agent, is it running?")?;
        println!("🛑 Sent stop signal to kaipo-agent (PID: {pid})");
        Ok(())
    }

    pub async fn handle_check_command(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate().context("Invalid configuration")?;

        let ctx = AgentContext::new(config);
        let client = ReportClient::new(&ctx).context("Failed to create HTTP client")?;

        println!("🔍 Testing connection to {}", client.endpoint());
        let status = client
            .test_connection()
            .await
            .context("Connection test failed")?;

        println!("✅ Server is reachable (HTTP {status})");
        if status == 401 {
            println!("⚠️  The server rejected the token; check the configured token");
        }
        Ok(())
    }
}

/// Wires collectors, submitter and scheduler, then runs until stopped.
pub async fn run_agent(ctx: Arc<AgentContext>) -> Result<(), AgentError> {
    let (stop_tx, stop_rx) = runtime::stop_channel();
    let listener = runtime::spawn_signal_listener(stop_tx);

    let client =
        ReportClient::new(&ctx).map_err(|e| AgentError::Runtime(format!("HTTP client: {e}")))?;
    let network = NetworkCollector::new(Arc::new(TrafficSampler::new()));
    let hostinfo = HostInfoCollector::new(ctx.clone())
        .map_err(|e| AgentError::Runtime(format!("host info: {e}")))?;

    let scheduler = ReportScheduler::new(ctx.clone(), network, Arc::new(client), stop_rx)
        .with_collector(Arc::new(SshCollector::new()))
        .with_collector(Arc::new(SystemCollector::new()))
        .with_collector(Arc::new(hostinfo));

    let result = scheduler.run(Box::new(SysinfoCounters::new())).await;
    listener.abort();
    result
}
