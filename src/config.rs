//! Command line and environment configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::db::default_data_dir;
use crate::logging::default_log_level;

#[derive(Debug, Parser)]
#[command(name = "bookshelf")]
#[command(version)]
#[command(about = "Passcode-gated personal book list in your terminal.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding the database and logs (defaults to ~/.bookshelf)
    #[arg(long, global = true, env = "BOOKSHELF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// trace | debug | info | warn | error
    #[arg(long, global = true, env = "BOOKSHELF_LOG")]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the passcode that unlocks the app
    #[command(subcommand)]
    Passcode(PasscodeCommand),
}

#[derive(Debug, Clone, Copy, Subcommand, PartialEq, Eq)]
pub enum PasscodeCommand {
    /// Enroll a new passcode, replacing any existing one
    Set,
    /// Remove the enrolled passcode
    Clear,
    /// Report whether a passcode is enrolled
    Status,
}

/// Settings resolved from the command line, environment, and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        Ok(Self {
            log_dir: data_dir.join("logs"),
            data_dir,
            log_level: cli
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_data_dir_drives_log_dir() {
        let cli = Cli::parse_from(["bookshelf", "--data-dir", "/tmp/shelf", "--log-level", "warn"]);
        let config = AppConfig::from_cli(&cli).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/shelf"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/shelf/logs"));
        assert_eq!(config.log_level, "warn");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_passcode_subcommands() {
        let cli = Cli::parse_from(["bookshelf", "passcode", "set"]);
        assert!(matches!(
            cli.command,
            Some(Command::Passcode(PasscodeCommand::Set))
        ));

        let cli = Cli::parse_from(["bookshelf", "passcode", "status", "--data-dir", "/x"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/x")));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
