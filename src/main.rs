use anyhow::Result;
use clap::Parser;
use kaipo_agent::cli::{AgentCommandHandler, Cli, Commands};
use kaipo_agent::config::default_config_path;
use kaipo_agent::logging;
use kaipo_agent::runtime::PidFile;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.log_file.as_deref())?;

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let handler = AgentCommandHandler::new(config_path, PidFile::default());

    match cli.command {
        Commands::Run { server, token } => handler.handle_run_command(server, token).await?,
        Commands::Configure {
            server,
            token,
            interval,
        } => handler.handle_configure_command(server, token, interval)?,
        Commands::Status => handler.handle_status_command()?,
        Commands::Stop => handler.handle_stop_command()?,
        Commands::Check => handler.handle_check_command().await?,
    }

    Ok(())
}
