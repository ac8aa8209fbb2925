use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeezerConfig {
  /// Long-lived login credential for the gw-light session. Must be
  /// exactly 192 characters; validated when the gateway is built.
  pub arl: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpotifyConfig {
  #[serde(default = "default_market")]
  pub market: String,
}

fn default_market() -> String {
  "GB".to_string()
}

impl Default for SpotifyConfig {
  fn default() -> Self {
    Self {
      market: default_market(),
    }
  }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TidalConfig {
  pub token: Option<String>,
  #[serde(default = "default_country_code")]
  pub country_code: String,
}

fn default_country_code() -> String {
  "US".to_string()
}

impl Default for TidalConfig {
  fn default() -> Self {
    Self {
      token: None,
      country_code: default_country_code(),
    }
  }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
  /// Ceiling for discography fan-out at the dispatcher level.
  #[serde(default = "default_fanout_concurrency")]
  pub fanout_concurrency: usize,
  /// Ceiling for per-item track resolution inside converters.
  #[serde(default = "default_item_concurrency")]
  pub item_concurrency: usize,
}

fn default_fanout_concurrency() -> usize {
  10
}

fn default_item_concurrency() -> usize {
  25
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      fanout_concurrency: default_fanout_concurrency(),
      item_concurrency: default_item_concurrency(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolver_defaults() {
    let config = ResolverConfig::default();
    assert_eq!(config.fanout_concurrency, 10);
    assert_eq!(config.item_concurrency, 25);
  }

  #[test]
  fn test_partial_config_fills_defaults() {
    let config: crate::configs::Config = toml::from_str(
      r#"
[deezer]
arl = "abc"

[resolver]
item_concurrency = 5
"#,
    )
    .expect("parse");

    assert_eq!(config.deezer.unwrap().arl, "abc");
    assert_eq!(config.resolver.fanout_concurrency, 10);
    assert_eq!(config.resolver.item_concurrency, 5);
    assert_eq!(config.spotify.market, "GB");
    assert_eq!(config.tidal.country_code, "US");
  }
}
