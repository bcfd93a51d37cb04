use super::schema::DashpilotConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid URL {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./dashpilot.yaml
    /// 2. ~/.dashpilot/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<DashpilotConfig, ConfigError> {
        let local_config = PathBuf::from("./dashpilot.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".dashpilot").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(DashpilotConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<DashpilotConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: DashpilotConfig = serde_yaml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load (explicit path or default locations), apply environment
    /// overrides and validate.
    pub async fn load(path: Option<&Path>) -> Result<DashpilotConfig, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path).await?,
            None => Self::load_default().await?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
