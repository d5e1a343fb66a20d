use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

/// Environment variables checked for the API key, in order
const KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Load the file at `path` (defaults if missing or unreadable), apply `f`, and write it back
    pub fn update_at<F>(path: &Path, f: F) -> Result<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = Self::load_from(path).unwrap_or_else(|_| Self::new());
        f(&mut config);
        config.save_to(path)
    }

    /// API key from the environment first (`GEMINI_API_KEY`, then `API_KEY`), then the file
    pub fn resolved_api_key(&self) -> Option<String> {
        self.resolve_api_key(env_var).map(|(key, _)| key)
    }

    /// Model from `VYASA_MODEL`, then the file
    pub fn resolved_model(&self) -> Option<String> {
        std::env::var("VYASA_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.model.clone())
    }

    /// Returns where the API key comes from: "env", "config", or None
    pub fn key_source(&self) -> Option<&'static str> {
        self.resolve_api_key(env_var).map(|(_, source)| source)
    }

    /// Blank values don't count, so an empty variable falls through to the next one
    fn resolve_api_key<F>(&self, lookup: F) -> Option<(String, &'static str)>
    where
        F: Fn(&str) -> Option<String>,
    {
        KEY_VARS
            .iter()
            .filter_map(|var| lookup(*var))
            .find(|key| !key.trim().is_empty())
            .map(|key| (key, "env"))
            .or_else(|| {
                self.api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
                    .map(|key| (key, "config"))
            })
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("veda-vyasa"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_key: Some("secret".to_string()),
            model: Some("gemini-2.5-pro".to_string()),
            base_url: None,
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "model": "gemini-2.5-flash" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_update_keeps_other_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "model": "gemini-2.5-pro", "base_url": "http://proxy.local" }"#).unwrap();

        Config::update_at(&path, |c| c.api_key = Some("typed-key".to_string())).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("typed-key"));
        assert_eq!(config.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.base_url.as_deref(), Some("http://proxy.local"));
    }

    #[test]
    fn test_blank_env_key_falls_through() {
        let env: HashMap<&str, &str> = [("GEMINI_API_KEY", ""), ("API_KEY", "from-env")].into();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_api_key(lookup),
            Some(("from-env".to_string(), "env"))
        );
    }

    #[test]
    fn test_key_source_matches_resolved_key() {
        let blank_env = |name: &str| match name {
            "GEMINI_API_KEY" => Some("  ".to_string()),
            _ => None,
        };

        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_api_key(blank_env),
            Some(("from-file".to_string(), "config"))
        );

        let empty = Config {
            api_key: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(empty.resolve_api_key(blank_env), None);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
