use anyhow::{Context, Result};
use std::path::PathBuf;

use bantay_types::config::BantayConfig;

/// Returns the Bantay home directory (~/.bantay/)
pub fn bantay_home() -> PathBuf {
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".bantay")
}

/// Returns the path to the config file (~/.bantay/config.toml)
pub fn config_path() -> PathBuf {
    bantay_home().join("config.toml")
}

/// Load config from disk, creating default if it doesn't exist.
pub fn load_config() -> Result<BantayConfig> {
    let path = config_path();

    if !path.exists() {
        let home = bantay_home();
        std::fs::create_dir_all(&home)
            .with_context(|| format!("Failed to create {}", home.display()))?;

        let default = BantayConfig::default();
        let toml_str = toml::to_string_pretty(&default)
            .context("Failed to serialize default config")?;
        std::fs::write(&path, &toml_str)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;

        return Ok(default);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: BantayConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(config)
}

/// Save config to disk, overwriting the existing file.
pub fn save_config(config: &BantayConfig) -> Result<()> {
    let path = config_path();
    let toml_str = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    std::fs::write(&path, toml_str)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bantay_home_path() {
        let home = bantay_home();
        assert!(home.to_string_lossy().contains(".bantay"));
    }

    #[test]
    fn default_config_roundtrips() {
        let config = BantayConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: BantayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.url, config.server.url);
        assert_eq!(parsed.realtime.base_delay_ms, 500);
        assert!(parsed.realtime.max_attempts.is_none());
    }
}
