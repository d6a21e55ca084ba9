//! Application configuration management.
//!
//! Configuration is stored at `~/.config/mark8/config.json`. The API URL and
//! data directory can be overridden with `MARK8_API_URL` and
//! `MARK8_DATA_DIR`, which may come from a `.env` file loaded by the binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, DEFAULT_API_URL};
use crate::auth::{CookieJar, CredentialStore, KeyringVault, SessionFile, TokenSink};

/// Application name used for config/data directory paths
const APP_NAME: &str = "mark8";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const API_URL_ENV: &str = "MARK8_API_URL";
pub const DATA_DIR_ENV: &str = "MARK8_DATA_DIR";

/// Keychain account holding the token pair
const KEYRING_ACCOUNT: &str = "session";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    /// Also keep a copy of the tokens in the OS keychain
    pub use_keyring: bool,
    pub log_dir: Option<PathBuf>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
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

    /// API base URL: environment, then config file, then the production URL.
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Directory for the session, cookies, cart and saved products.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Persistence sinks for the credential store, snapshot file first.
    ///
    /// The snapshot file and cookie jar are always present; the keychain is
    /// an extra copy on top of them.
    pub fn token_sinks(&self) -> Result<Vec<Box<dyn TokenSink>>> {
        let dir = self.data_dir()?;
        let mut sinks: Vec<Box<dyn TokenSink>> = vec![
            Box::new(SessionFile::new(&dir)),
            Box::new(CookieJar::new(&dir)),
        ];
        if self.use_keyring {
            sinks.push(Box::new(KeyringVault::new(KEYRING_ACCOUNT)));
        }
        Ok(sinks)
    }

    /// Restore the session and build an API client over it.
    pub fn connect(&self) -> Result<ApiClient> {
        let store = Arc::new(CredentialStore::open(self.token_sinks()?));
        ApiClient::new(&self.api_url(), store)
    }
}
