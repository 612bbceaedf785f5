//! Configuration management for console-chat
//!
//! Handles loading and saving the TOML config file holding model provider
//! settings, tool category defaults and the platform endpoint.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::catalog;
use crate::tools::{CategorySet, ToolCategory};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model provider id: "gemini", "openai", "anthropic", ...
    pub provider: String,
    /// Model id; the provider's default model when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// API key (can be loaded from env)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Ask the model to think before answering, where supported
    pub thinking: bool,
    /// Upper bound on tool rounds per turn
    pub max_tool_rounds: usize,
    /// Tool categories enabled at startup
    pub enabled_categories: Vec<ToolCategory>,
    pub platform: PlatformConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            api_key: None,
            api_key_env: None,
            thinking: false,
            max_tool_rounds: 10,
            enabled_categories: ToolCategory::ALL.to_vec(),
            platform: PlatformConfig::default(),
        }
    }
}

impl Config {
    /// Model to use, falling back to the provider's default
    pub fn model(&self) -> String {
        self.model
            .clone()
            .or_else(|| catalog::default_model(&self.provider).map(|m| m.to_string()))
            .unwrap_or_default()
    }

    /// Get the API key, checking environment variables if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }

        let env_name = self
            .api_key_env
            .as_deref()
            .or_else(|| catalog::api_key_env(&self.provider))?;
        std::env::var(env_name).ok().filter(|k| !k.is_empty())
    }

    pub fn category_set(&self) -> CategorySet {
        self.enabled_categories.iter().copied().collect()
    }
}

/// Backend platform connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// API root, e.g. `https://cloud.appwrite.io/v1`
    pub endpoint: String,
    /// Project selected at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloud.appwrite.io/v1".to_string(),
            project_id: None,
            api_key: None,
            api_key_env: "APPWRITE_API_KEY".to_string(),
        }
    }
}

impl PlatformConfig {
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            Config::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("console-chat").join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}
