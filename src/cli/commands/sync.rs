//! Sync command implementation
//!
//! Runs one sync: fetch, resolve, apply, and checkpoint every configured
//! entity in dependency order.

use crate::config::load_config;
use crate::core::sync::SyncCoordinator;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Sync only the named table(s) (comma-separated); dependency order still
    /// applies within the selection
    #[arg(long)]
    pub table: Option<String>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if let Some(tables) = &self.table {
            let selected: Vec<String> = tables
                .split(',')
                .map(|s| s.trim().to_string())
                .collect();
            tracing::info!(tables = ?selected, "Restricting sync to selected tables");
            config.tables.retain(|t| selected.contains(&t.name));
            if config.tables.is_empty() {
                eprintln!("None of the selected tables are configured: {tables}");
                return Ok(2);
            }
        }

        if !self.yes {
            println!("Sync Configuration:");
            println!("  State file: {}", config.sync.state_file);
            println!("  Chunk size: {}", config.sync.chunk_size);
            println!(
                "  Tables: {:?}",
                config.tables.iter().map(|t| &t.name).collect::<Vec<_>>()
            );
            println!();
            print!("Proceed with sync? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Sync cancelled.");
                return Ok(0);
            }
        }

        tracing::info!("Creating sync coordinator");
        let mut coordinator = match SyncCoordinator::connect(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create sync coordinator");
                eprintln!("Failed to initialize sync: {e}");
                return Ok(4);
            }
        };

        let summary = match coordinator.execute_sync().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Sync failed");
                eprintln!("Sync failed: {e}");
                return Ok(5);
            }
        };

        println!();
        println!("Sync Summary ({}):", summary.run_id);
        println!("  Entities: {}", summary.entities.len());
        println!("  Rows fetched: {}", summary.rows_fetched());
        println!("  Rows applied: {}", summary.rows_applied());
        println!("  Rows failed: {}", summary.rows_failed());
        println!("  Placeholders created: {}", summary.placeholder_rows());
        println!("  Unresolved references: {}", summary.unresolved_refs());
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!("  Success rate: {:.2}%", summary.success_rate());
        println!();

        for entity in &summary.entities {
            println!(
                "  {}: fetched {}, applied {}, failed {}, dropped {}, watermark {}",
                entity.table,
                entity.rows_fetched,
                entity.rows_applied,
                entity.rows_failed,
                entity.rows_dropped,
                if entity.watermark_advanced {
                    "advanced"
                } else {
                    "unchanged"
                }
            );
        }

        if !summary.errors.is_empty() {
            println!();
            println!("Errors encountered:");
            for error in &summary.errors {
                println!("  - {:?}: {}", error.error_type, error.message);
                if let Some(context) = &error.context {
                    println!("    Context: {context}");
                }
            }
        }

        let exit_code = if summary.interrupted {
            println!();
            println!("Sync interrupted gracefully. Progress saved.");
            println!("Run the same command to resume from the last checkpoint.");
            130
        } else if summary.aborted_on_schema_error {
            println!();
            println!("Sync aborted on a schema-class error.");
            5
        } else if summary.is_successful() {
            println!();
            println!("Sync completed successfully.");
            0
        } else {
            println!();
            println!("Sync completed with failures; affected watermarks were not advanced.");
            1
        };

        Ok(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_args_defaults() {
        let args = SyncArgs {
            yes: false,
            table: None,
        };
        assert!(!args.yes);
        assert!(args.table.is_none());
    }

    #[test]
    fn test_sync_args_with_table_selection() {
        let args = SyncArgs {
            yes: true,
            table: Some("dim_products,all_sales".to_string()),
        };
        assert!(args.yes);
        assert_eq!(args.table.as_deref(), Some("dim_products,all_sales"));
    }
}
