//! Settings file and environment overrides

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tapkit_transport_pcsc::PcscConfig;

/// Settings read from `~/.tapkit/tapkit.toml` and `TAPKIT_*` variables
///
/// ```toml
/// reader = "ACS ACR122U PICC Interface 00 00"
/// share_mode = "exclusive"
/// classic_key = "a0a1a2a3a4a5"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Reader used when `--reader` is not given
    pub reader: Option<String>,
    /// PC/SC share mode: shared, exclusive or direct
    pub share_mode: Option<String>,
    /// MIFARE Classic key used when `--key` is not given, hex
    pub classic_key: Option<String>,
}

impl Config {
    /// PC/SC session settings
    pub fn pcsc(&self) -> Result<PcscConfig, Box<dyn std::error::Error>> {
        let config = PcscConfig::default();
        Ok(match &self.share_mode {
            Some(mode) => config.with_share_mode(mode.parse()?),
            None => config,
        })
    }
}

/// Returns the base config directory for tapkit
pub fn config_dir() -> Option<PathBuf> {
    std::env::home_dir().map(|home| home.join(".tapkit"))
}

/// Load the settings; a missing file leaves every setting unset
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let mut figment = Figment::new();
    if let Some(dir) = config_dir() {
        figment = figment.merge(Toml::file(dir.join("tapkit.toml")));
    }
    Ok(figment.merge(Env::prefixed("TAPKIT_")).extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_under_home() {
        if let Some(home) = std::env::home_dir() {
            assert_eq!(config_dir(), Some(home.join(".tapkit")));
        }
    }
}
