//! Config command - View and manage bibsync configuration
//!
//! Provides the `bibsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON), with the API key masked
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Prints the configuration file path

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use bibsync_core::config::Config;
use bibsync_core::domain::UserId;

use crate::bootstrap;
use crate::output::{get_formatter, OutputFormat};

const MASKED_KEY: &str = "********";

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.poll_interval")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    /// Execute the config command against the file at `config_path`
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config_path, format),
            ConfigCommand::Set { key, value } => {
                self.execute_set(config_path, key, value, format)
            }
            ConfigCommand::Validate => self.execute_validate(config_path, format),
            ConfigCommand::Path => self.execute_path(config_path, format),
        }
    }

    fn execute_show(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = masked(bootstrap::load_config(config_path, false)?);

        info!(config_path = %config_path.display(), "Showing configuration");

        if format == OutputFormat::Json {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;

            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(
        &self,
        config_path: &Path,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(format);
        let mut config = bootstrap::load_config(config_path, false)?;

        info!(key = %key, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "success": false,
                    "key": key,
                    "error": e.to_string(),
                });
                formatter.print_json(&json);
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, description) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {name:<32} - {description}"));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "success": false,
                    "key": key,
                    "errors": messages,
                });
                formatter.print_json(&json);
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    messages.join("; ")
                ));
            }
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create configuration directory")?;
        }
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        std::fs::write(config_path, &yaml).context("Failed to write configuration file")?;

        let shown = if key == "remote.api_key" { MASKED_KEY } else { value };
        if format == OutputFormat::Json {
            let json = serde_json::json!({
                "success": true,
                "key": key,
                "value": shown,
                "config_path": config_path.display().to_string(),
            });
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Set {} = {}", key, shown));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    fn execute_validate(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !config_path.exists() {
            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "valid": true,
                    "config_path": config_path.display().to_string(),
                    "errors": [],
                    "note": "Configuration file not found. Using defaults.",
                });
                formatter.print_json(&json);
            } else {
                formatter.info(&format!(
                    "Configuration file not found at {}",
                    config_path.display()
                ));
                formatter.info(
                    "Using default configuration. Run 'bibsync config set <key> <value>' to create one.",
                );
            }
            return Ok(());
        }

        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                if format == OutputFormat::Json {
                    let json = serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {}", e)],
                    });
                    formatter.print_json(&json);
                } else {
                    formatter.error(&format!("Failed to parse configuration: {}", e));
                    formatter.info(&format!("File: {}", config_path.display()));
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format == OutputFormat::Json {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            let json = serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            });
            formatter.print_json(&json);
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }

    fn execute_path(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        if format == OutputFormat::Json {
            let json = serde_json::json!({
                "config_path": config_path.display().to_string(),
                "exists": config_path.exists(),
            });
            get_formatter(format).print_json(&json);
        } else {
            println!("{}", config_path.display());
        }
        Ok(())
    }
}

/// Keys accepted by `config set`
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("sync.poll_interval", "Seconds between polls in watch mode"),
    ("sync.max_concurrent_libraries", "Libraries synced at once"),
    ("sync.include_groups", "true|false"),
    ("remote.base_url", "API root URL"),
    ("remote.api_key", "API key (none to clear)"),
    ("remote.user_id", "Numeric user ID (none to resolve from key)"),
    ("remote.keys_per_request", "Keys per fetch request (1-50)"),
    ("remote.max_retries", "Retries for throttled requests"),
    ("storage.database", "SQLite database path"),
    ("logging.level", "trace|debug|info|warn|error"),
];

fn masked(mut config: Config) -> Config {
    if config.remote.api_key.is_some() {
        config.remote.api_key = Some(MASKED_KEY.to_string());
    }
    config
}

fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.poll_interval" => {
            config.sync.poll_interval = value
                .parse::<u64>()
                .context("Expected a positive integer for sync.poll_interval")?;
        }
        "sync.max_concurrent_libraries" => {
            config.sync.max_concurrent_libraries = value
                .parse::<usize>()
                .context("Expected a positive integer")?;
        }
        "sync.include_groups" => {
            config.sync.include_groups = value
                .parse::<bool>()
                .context("Expected true or false")?;
        }

        // --- remote ---
        "remote.base_url" => {
            config.remote.base_url = value.to_string();
        }
        "remote.api_key" => {
            config.remote.api_key = optional(value).map(str::to_string);
        }
        "remote.user_id" => {
            config.remote.user_id = optional(value)
                .map(str::parse::<UserId>)
                .transpose()
                .context("Expected a numeric user ID")?;
        }
        "remote.keys_per_request" => {
            config.remote.keys_per_request = value
                .parse::<usize>()
                .context("Expected a positive integer")?;
        }
        "remote.max_retries" => {
            config.remote.max_retries = value
                .parse::<u32>()
                .context("Expected a non-negative integer")?;
        }

        // --- storage ---
        "storage.database" => {
            config.storage.database = PathBuf::from(value);
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
