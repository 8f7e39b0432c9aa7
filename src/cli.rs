use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "visa-log-server", version, about = "Visa checker log ingestion service")]
pub struct Cli {
    /// Configuration file path (optional; defaults apply when absent)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the log server (default)
    Start {
        /// Listen port, overriding the configuration file
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Test configuration file validity
    Test,

    /// Show version information
    Version,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start { port: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_start() {
        let cli = Cli {
            config: PathBuf::from("config.toml"),
            command: None,
        };

        match cli.get_command() {
            Commands::Start { port } => assert!(port.is_none()),
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_cli_parsing_start_with_port() {
        let cli = Cli::try_parse_from(["visa-log-server", "start", "--port", "8080"]).unwrap();

        match cli.get_command() {
            Commands::Start { port } => assert_eq!(port, Some(8080)),
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_cli_parsing_global_config() {
        let cli = Cli::try_parse_from(["visa-log-server", "test", "-c", "/etc/visa/logs.toml"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("/etc/visa/logs.toml"));
        assert!(matches!(cli.get_command(), Commands::Test));
    }
}
