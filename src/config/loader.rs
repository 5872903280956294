use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::types::SyncError;

use super::{paths, Config};

impl Config {
    /// Load configuration from config.json in the app directory.
    /// Falls back to defaults if the file doesn't exist or can't be parsed.
    pub async fn load() -> Self {
        match Self::try_load().await {
            Ok(config) => {
                info!(
                    api = %config.api_base_url,
                    gate = config.gate_capacity,
                    "Loaded configuration"
                );
                config
            }
            Err(err) => {
                warn!(error = ?err, "Failed to load config.json, using defaults");
                Self::default()
            }
        }
    }

    async fn try_load() -> Result<Self, SyncError> {
        let config_path = paths::get_config_path()?;
        Self::try_load_from(&config_path).await
    }

    async fn try_load_from(config_path: &Path) -> Result<Self, SyncError> {
        if !config_path.exists() {
            warn!(path = %config_path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(config_path)
            .await
            .map_err(|err| SyncError::Config(format!("Failed to read config file: {err}")))?;

        serde_json::from_str(&contents)
            .map_err(|err| SyncError::Config(format!("Failed to parse config.json: {err}")))
    }
}
