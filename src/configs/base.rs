use serde::{Deserialize, Serialize};

use crate::common::errors::ResolveError;
use crate::configs::*;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
  #[serde(default)]
  pub deezer: Option<DeezerConfig>,
  #[serde(default)]
  pub spotify: SpotifyConfig,
  #[serde(default)]
  pub tidal: TidalConfig,
  #[serde(default)]
  pub resolver: ResolverConfig,
  pub logging: Option<LoggingConfig>,
}

impl Config {
  pub fn load() -> Result<Self, ResolveError> {
    let config_path = if std::path::Path::new("config.toml").exists() {
      "config.toml"
    } else if std::path::Path::new("config.default.toml").exists() {
      "config.default.toml"
    } else {
      return Err(ResolveError::Config(
        "config.toml or config.default.toml not found".to_string(),
      ));
    };

    let config_str = std::fs::read_to_string(config_path)
      .map_err(|e| ResolveError::Config(format!("{}: {}", config_path, e)))?;
    if config_str.is_empty() {
      return Err(ResolveError::Config(format!("{} is empty", config_path)));
    }

    toml::from_str(&config_str).map_err(|e| ResolveError::Config(format!("{}: {}", config_path, e)))
  }
}
