use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the kaipo-agent application
#[derive(Parser, Debug)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Host telemetry agent - reports SSH activity, system load and network traffic to a remote collector")]
#[command(long_about = "Kaipo Agent samples network traffic on the host's public interface, gathers SSH login \
activity, load averages and host identity, and reports them over HTTPS to a collector server. \
The server can renegotiate the report interval; failed reports are retried with exponential backoff \
and buffered traffic samples are kept until a report is confirmed.")]
pub struct Cli {
    /// Configuration file (defaults to /etc/kaipo-agent/config.json for root,
    /// ~/.kaipo-agent/config.json otherwise)
    #[arg(short, long, global = true, help = "Path to the configuration file")]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long = "log", global = true, help = "Log file path (defaults to stderr)")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level: debug, info, warn, error"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands for the kaipo-agent application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the agent in the foreground until stopped
    #[command(about = "Run the reporting agent")]
    #[command(long_about = "Runs the agent in the foreground: writes the PID file, sends an initial report, \
then reports on every interval tick until SIGINT, SIGTERM or SIGHUP. An invalid token makes the agent exit \
after a one minute grace period.\n\n\
Examples:\n  \
kaipo-agent run                                          # Use saved configuration\n  \
kaipo-agent run --server https://monitor.example.com     # Override the server URL\n  \
kaipo-agent --log /var/log/kaipo-agent.log run           # Log to a file")]
    Run {
        /// Overrides the configured server URL
        #[arg(short, long, help = "Server URL")]
        server: Option<String>,

        /// Overrides the configured authentication token
        #[arg(short, long, help = "Authentication token")]
        token: Option<String>,
    },

    /// Validate and save connection settings
    #[command(about = "Save server URL and token to the configuration file")]
    #[command(long_about = "Validates and writes the agent configuration. The file is created with \
owner-only permissions.\n\n\
Examples:\n  \
kaipo-agent configure --server https://monitor.example.com --token <TOKEN>\n  \
kaipo-agent configure --server https://monitor.example.com --token <TOKEN> --interval 120")]
    Configure {
        #[arg(short, long, help = "Server URL (http:// or https://)")]
        server: String,

        #[arg(short, long, help = "Authentication token")]
        token: String,

        /// Report interval in seconds; the server may change it later
        #[arg(short, long, help = "Report interval in seconds")]
        interval: Option<u64>,
    },

    /// Show whether an agent instance is running
    #[command(about = "Show agent status")]
    Status,

    /// Stop a running agent
    #[command(about = "Stop the running agent (sends SIGTERM)")]
    Stop,

    /// Check that the configured server is reachable
    #[command(about = "Test the connection to the server")]
    Check,
}
