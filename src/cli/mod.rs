//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for tributary using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tributary - incremental warehouse sync
#[derive(Parser, Debug)]
#[command(name = "tributary")]
#[command(version, about, long_about = None)]
#[command(author = "Tributary Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tributary.toml", env = "TRIBUTARY_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TRIBUTARY_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a sync of all configured entities
    Sync(commands::sync::SyncArgs),

    /// Validate configuration file and show the derived load order
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show watermarks and unresolved references
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_sync() {
        let cli = Cli::parse_from(["tributary", "sync"]);
        assert_eq!(cli.config, "tributary.toml");
        assert!(matches!(cli.command, Commands::Sync(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["tributary", "--config", "custom.toml", "sync"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["tributary", "--log-level", "debug", "sync"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_sync_with_tables() {
        let cli = Cli::parse_from(["tributary", "sync", "--yes", "--table", "dim_products"]);
        match cli.command {
            Commands::Sync(args) => {
                assert!(args.yes);
                assert_eq!(args.table.as_deref(), Some("dim_products"));
            }
            _ => panic!("expected sync command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["tributary", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["tributary", "status", "--local-only"]);
        match cli.command {
            Commands::Status(args) => assert!(args.local_only),
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["tributary", "init", "--force"]);
        match cli.command {
            Commands::Init(args) => assert!(args.force),
            _ => panic!("expected init command"),
        }
    }
}
