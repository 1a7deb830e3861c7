//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, the last email used to log in and the
//! credential storage backend. It never holds the token itself.
//!
//! Configuration is stored at `~/.config/faceaccess/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::DEFAULT_TIMEOUT_SECS;
use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore};

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "faceaccess";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API address used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Environment override for the API address
pub const API_URL_ENV: &str = "FACEACCESS_API_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON file in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl std::str::FromStr for CredentialBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(CredentialBackend::File),
            "keyring" => Ok(CredentialBackend::Keyring),
            "memory" => Ok(CredentialBackend::Memory),
            other => Err(format!(
                "unknown credential backend '{}', expected file, keyring or memory",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// API address: environment first, then the config file, then the default
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Build the credential store selected by `credential_backend`
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::new(self.data_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        })
    }
}
