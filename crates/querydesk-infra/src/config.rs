//! Configuration loading.
//!
//! Reads `config.toml` from the data directory (`~/.querydesk/` by
//! default, overridable via `QUERYDESK_DATA_DIR`) into
//! [`RouterConfig`]. Falls back to defaults when the file is missing or
//! malformed rather than refusing to start.

use std::path::{Path, PathBuf};

use querydesk_types::config::RouterConfig;

/// Resolve the data directory from `QUERYDESK_DATA_DIR`, falling back
/// to `~/.querydesk`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("QUERYDESK_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".querydesk")
        }
    }
}

/// Load router configuration from `{data_dir}/config.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or unparseable file: warn and use defaults.
pub async fn load_router_config(data_dir: &Path) -> RouterConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no config.toml at {}, using defaults", config_path.display());
            return RouterConfig::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", config_path.display());
            return RouterConfig::default();
        }
    };

    match toml::from_str::<RouterConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RouterConfig::default()
        }
    }
}
