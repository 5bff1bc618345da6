pub mod agent_commands;
pub mod commands;

pub use agent_commands::{AgentCommandHandler, run_agent};
pub use commands::{Cli, Commands};
