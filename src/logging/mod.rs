//! Logging and observability
//!
//! Structured logging built on `tracing`: console output, configurable log
//! levels, and optional JSON file logging with rotation.
//!
//! # Example
//!
//! ```no_run
//! use tributary::logging::init_logging;
//! use tributary::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Sync started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};
