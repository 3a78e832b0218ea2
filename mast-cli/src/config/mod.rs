//! Connection settings
//!
//! Resolved in layers, later ones winning: built-in defaults, the TOML file in
//! the user config directory, `MAST_URL` / `MAST_API_KEY` (also read from a
//! `.env` file), then the `--url` / `--key` flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_API_URL;

pub const URL_VAR: &str = "MAST_URL";
pub const API_KEY_VAR: &str = "MAST_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the MAST API
    pub url: String,
    /// Key sent as `X-Api-Key` on mutating requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            api_key: None,
        }
    }
}

/// Location of the config file (`~/.config/mast/config.toml` on Linux)
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine the user config directory")?;
    Ok(dir.join("mast").join("config.toml"))
}

impl Config {
    /// Resolve the effective configuration for this invocation
    pub fn resolve(url: Option<String>, api_key: Option<String>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }

        let mut config = Self::read(&config_path()?)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.apply_overrides(url, api_key);

        log::debug!("Using API at {} (key {})", config.url, config.masked_key());
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Apply environment variables through `var`
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var(URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.url = url;
        }
        if let Some(key) = var(API_KEY_VAR).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    /// Apply command-line flags
    pub fn apply_overrides(&mut self, url: Option<String>, api_key: Option<String>) {
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(key) = api_key {
            self.api_key = Some(key);
        }
    }

    /// API key with all but the last four characters hidden
    pub fn masked_key(&self) -> String {
        match &self.api_key {
            None => "not set".to_string(),
            Some(key) => {
                let visible: String = key
                    .chars()
                    .rev()
                    .take(4)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .collect();
                format!("****{}", visible)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.url, "https://mast-dev.epfl.ch/api");
    }

    #[test]
    fn test_save_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mast").join("config.toml");
        let config = Config {
            url: "http://localhost:8000/api".to_string(),
            api_key: Some("secret-key".to_string()),
        };

        config.save(&path).unwrap();

        assert_eq!(Config::read(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"abc\"\n").unwrap();

        let config = Config::read(&path).unwrap();
        assert_eq!(config.url, DEFAULT_API_URL);
        assert_eq!(config.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_layer_precedence() {
        let env: HashMap<&str, &str> =
            HashMap::from([(URL_VAR, "http://env/api"), (API_KEY_VAR, "env-key")]);
        let mut config = Config {
            url: "http://file/api".to_string(),
            api_key: Some("file-key".to_string()),
        };

        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.url, "http://env/api");
        assert_eq!(config.api_key.as_deref(), Some("env-key"));

        config.apply_overrides(None, Some("cli-key".to_string()));
        assert_eq!(config.url, "http://env/api");
        assert_eq!(config.api_key.as_deref(), Some("cli-key"));
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_masked_key() {
        let mut config = Config::default();
        assert_eq!(config.masked_key(), "not set");
        config.api_key = Some("abcdef123456".to_string());
        assert_eq!(config.masked_key(), "****3456");
    }
}
