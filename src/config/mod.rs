//! Configuration management
//!
//! TOML-backed configuration with environment substitution, `TRIBUTARY_*`
//! overrides, per-section validation, and zeroizing credential storage.
//!
//! # Example
//!
//! ```no_run
//! use tributary::config::load_config;
//!
//! let config = load_config("tributary.toml").expect("Failed to load configuration");
//! println!("chunk size: {}", config.sync.chunk_size);
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BootstrapConfig, ForeignKeyConfig, LoggingConfig, RetryConfig,
    SourceConfig, SyncConfig, TableConfig, TributaryConfig, WarehouseConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
