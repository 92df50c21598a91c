use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "settings.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mailbox: MailboxConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    pub host: String,
    pub port: u16,
    pub folder: String,
    /// Keep the password in the OS keyring after a successful login.
    pub remember_password: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: PathBuf,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            folder: "INBOX".to_string(),
            remember_password: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("emails.db"),
        }
    }
}

impl StoreConfig {
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database.display())
    }
}

impl Config {
    /// Reads the settings file, falling back to defaults when it is missing or invalid.
    pub fn load(path: impl AsRef<Path>) -> Self {
        use std::fs;
        let path = path.as_ref();
        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => warn!("ignoring {}: {}", path.display(), e),
            }
        }
        Self::default()
    }
}
