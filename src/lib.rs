// Tributary - Warehouse Batch Reconciliation and Incremental Sync
// Copyright (c) 2025 Tributary Contributors
// Licensed under the MIT License

//! # Tributary - Incremental Warehouse Sync
//!
//! Tributary reconciles batches of externally sourced entity records into a
//! relational warehouse. It tracks per-entity high-water marks so re-runs
//! fetch only new or changed records, applies batches with idempotent
//! insert-or-update semantics, and keeps foreign-key integrity across
//! dimension and fact tables even when reference data arrives out of order.
//!
//! ## Architecture
//!
//! Tributary follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (state, plan, resolve, load, ledger, sync)
//! - [`adapters`] - External integrations (warehouse, record sources)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tributary::config::load_config;
//! use tributary::core::sync::SyncCoordinator;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tributary.toml")?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let mut coordinator = SyncCoordinator::connect(config, shutdown_rx).await?;
//!
//!     let summary = coordinator.execute_sync().await?;
//!     println!("Applied {} rows", summary.rows_applied());
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Sync
//!
//! Watermarks live in a human-inspectable JSON state file and only advance
//! after an entity's batches have been durably applied:
//!
//! ```rust,no_run
//! use tributary::core::state::{SyncStateStore, Watermark};
//! use tributary::domain::StateKey;
//!
//! # fn example() -> Result<(), tributary::domain::StateError> {
//! let mut store = SyncStateStore::load("tributary_state.json")?;
//! let key = StateKey::new("max_pos_order_id").unwrap();
//!
//! let current = store.get(&key, Watermark::Id(0));
//! store.advance(&key, Watermark::Id(500))?;
//! store.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reference Resolution
//!
//! Batches destined for tables with declared foreign keys pass through the
//! [`core::resolve::ReferenceResolver`] first. Missing referenced keys either
//! get a placeholder row in the referenced table or cause the dependent row
//! to be dropped, per the key's configured policy; every decision lands in
//! the missing-reference ledger for operator follow-up.
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`]. Errors carry their
//! classification: transient failures are retried with backoff, foreign-key
//! violations are routed back through resolution, and schema mismatches fail
//! fast.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
