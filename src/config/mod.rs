//! Client configuration loaded from TOML with environment overrides

pub mod policy;

pub use policy::UploadPolicy;

use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::dav::DavAccount;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_URL: &str = "CHUNKDAV_URL";
pub const ENV_USER: &str = "CHUNKDAV_USER";
pub const ENV_PASSWORD: &str = "CHUNKDAV_PASSWORD";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub user: String,
    /// Account id used in DAV paths; falls back to `user`
    pub user_id: Option<String>,
    pub password: String,
    pub user_agent: Option<String>,
    /// Default per-request timeout in seconds
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user: String::new(),
            user_id: None,
            password: String::new(),
            user_agent: None,
            request_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub chunk_size: u64,
    #[serde(flatten)]
    pub policy: UploadPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            policy: UploadPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `path` if given, then apply environment overrides
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL) {
            self.server.base_url = url;
        }
        if let Some(user) = lookup(ENV_USER) {
            self.server.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.server.password = password;
        }
    }

    pub fn to_account(&self) -> ConfigResult<DavAccount> {
        let server = &self.server;
        if server.base_url.is_empty() {
            return Err(ConfigError::Missing("server.base_url"));
        }
        if server.user.is_empty() {
            return Err(ConfigError::Missing("server.user"));
        }

        let mut account = DavAccount::new(&server.base_url, &server.user, &server.password);
        if let Some(user_id) = &server.user_id {
            account.user_id = user_id.clone();
        }
        if let Some(agent) = &server.user_agent {
            account.user_agent = agent.clone();
        }
        account.request_timeout = Duration::from_secs(server.request_timeout);
        Ok(account)
    }
}
