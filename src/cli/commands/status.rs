//! Status command implementation
//!
//! Shows the current watermarks from the state file and the unresolved
//! entries in the missing-reference ledger.

use crate::adapters::warehouse::traits::LedgerStorage;
use crate::adapters::warehouse::WarehouseClient;
use crate::config::load_config;
use crate::core::state::SyncStateStore;
use crate::domain::ids::TableName;
use clap::Args;
use std::str::FromStr;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show unresolved references for one referenced table only
    #[arg(long)]
    pub referenced_table: Option<String>,

    /// Skip the warehouse query and only show local state
    #[arg(long)]
    pub local_only: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let state = match SyncStateStore::load(&config.sync.state_file) {
            Ok(state) => state,
            Err(e) => {
                eprintln!("Failed to read state file: {e}");
                return Ok(5);
            }
        };

        println!("Watermarks ({}):", config.sync.state_file);
        if state.is_empty() {
            println!("  (none - first run pending)");
        }
        for (key, watermark) in state.iter() {
            println!("  {key} = {watermark}");
        }

        if self.local_only {
            return Ok(0);
        }

        let referenced_table = match &self.referenced_table {
            Some(name) => match TableName::from_str(name) {
                Ok(table) => Some(table),
                Err(e) => {
                    eprintln!("Invalid table name '{name}': {e}");
                    return Ok(2);
                }
            },
            None => None,
        };

        let client = match WarehouseClient::connect(config.warehouse).await {
            Ok(client) => client,
            Err(e) => {
                eprintln!("Failed to connect to warehouse: {e}");
                return Ok(4);
            }
        };

        let entries = match client.list_unresolved(referenced_table.as_ref()).await {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Failed to query ledger: {e}");
                return Ok(5);
            }
        };

        println!();
        println!("Unresolved references: {}", entries.len());
        for entry in &entries {
            println!(
                "  {} row {} -> {}.{} (since {})",
                entry.source_table,
                entry.source_row_id,
                entry.referenced_table,
                entry.referenced_key,
                entry.created_at.to_rfc3339()
            );
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            referenced_table: None,
            local_only: false,
        };
        assert!(args.referenced_table.is_none());
        assert!(!args.local_only);
    }
}
