//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API server, the last email used to log in, and where
//! the session is kept.
//!
//! Configuration is stored at `~/.config/postagent/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "postagent";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend the frontend dev server proxies `/api` to
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
}

fn default_require_session() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub last_email: Option<String>,
    #[serde(default)]
    pub session_backend: SessionBackend,
    /// Send visitors without a session to the login page
    #[serde(default = "default_require_session")]
    pub require_session: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            last_email: None,
            session_backend: SessionBackend::default(),
            require_session: default_require_session(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path()?)
    }

    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Record the email of a successful login in the config file.
    ///
    /// The file is re-read first, so overrides applied to an in-memory
    /// `Config` (such as `POSTAGENT_API_URL`) are not written back.
    pub fn remember_email(email: &str) -> Result<()> {
        Self::remember_email_at(Self::config_path()?, email)
    }

    pub fn remember_email_at(path: PathBuf, email: &str) -> Result<()> {
        let mut config = Self::load_from(path.clone())?;
        config.last_email = Some(email.to_string());
        config.save_to(path)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }
}
