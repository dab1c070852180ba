use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::conversation::RetentionPolicy;
use crate::state::{RequestParameters, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::template::PromptTemplate;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
pub const BASE_URL_ENV: &str = "PICOCHAT_BASE_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout in seconds; 0 disables it
    pub timeout_secs: u64,
    pub template: PromptTemplate,
    pub retention: RetentionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: 120,
            template: PromptTemplate::default(),
            retention: RetentionPolicy::default(),
        }
    }

    /// Load from the user config dir, then let `PICOCHAT_BASE_URL` override
    /// the server address.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut config = Self::load_from(&config_path)?;

        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.base_url = base_url.trim().to_string();
            }
        }

        Ok(config)
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
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Starting generation options for a session
    pub fn request_parameters(&self) -> RequestParameters {
        RequestParameters::new(self.max_tokens, self.temperature)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("picochat").join("config.json"))
    }
}
