//! Configuration loader with TOML parsing and environment variable overrides
//!
//! Loading order: read the TOML file, substitute `${VAR}` placeholders,
//! parse, apply `TRIBUTARY_*` environment overrides, validate.

use super::schema::TributaryConfig;
use crate::config::secret::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// # Errors
///
/// Returns an error if:
/// - the file cannot be read
/// - TOML parsing fails
/// - a referenced environment variable is not set
/// - configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tributary::config::load_config;
///
/// let config = load_config("tributary.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TributaryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: TributaryConfig = toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. All missing variables are collected and
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the TRIBUTARY_* prefix
///
/// Variables follow the pattern TRIBUTARY_<SECTION>_<KEY>, e.g.
/// TRIBUTARY_SYNC_CHUNK_SIZE or TRIBUTARY_WAREHOUSE_CONNECTION_STRING.
fn apply_env_overrides(config: &mut TributaryConfig) {
    if let Ok(val) = std::env::var("TRIBUTARY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Ok(val) = std::env::var("TRIBUTARY_WAREHOUSE_CONNECTION_STRING") {
        config.warehouse.connection_string = secret_string(val);
    }
    if let Ok(val) = std::env::var("TRIBUTARY_WAREHOUSE_MAX_CONNECTIONS") {
        if let Ok(size) = val.parse() {
            config.warehouse.max_connections = size;
        }
    }
    if let Ok(val) = std::env::var("TRIBUTARY_WAREHOUSE_SSL_MODE") {
        config.warehouse.ssl_mode = val;
    }

    if let Ok(val) = std::env::var("TRIBUTARY_SOURCE_PATH") {
        config.source.path = val;
    }

    if let Ok(val) = std::env::var("TRIBUTARY_SYNC_CHUNK_SIZE") {
        if let Ok(size) = val.parse() {
            config.sync.chunk_size = size;
        }
    }
    if let Ok(val) = std::env::var("TRIBUTARY_SYNC_PARALLEL_CHUNKS") {
        if let Ok(parallel) = val.parse() {
            config.sync.parallel_chunks = parallel;
        }
    }
    if let Ok(val) = std::env::var("TRIBUTARY_SYNC_STATE_FILE") {
        config.sync.state_file = val;
    }
    if let Ok(val) = std::env::var("TRIBUTARY_SYNC_MAX_ATTEMPTS") {
        if let Ok(attempts) = val.parse() {
            config.sync.retry.max_attempts = attempts;
        }
    }

    if let Ok(val) = std::env::var("TRIBUTARY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TRIBUTARY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
