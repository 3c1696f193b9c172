use crate::{DEFAULT_BURST, DEFAULT_QPS};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("cluster.apiServer is required")]
    MissingApiServer,

    #[error("cluster.apiServer is not a valid URL: {0}")]
    InvalidApiServer(#[from] url::ParseError),

    #[error("cluster.qps must not be negative (found {0})")]
    NegativeQps(f32),

    #[error("At least one user must be configured")]
    NoUsers,

    #[error("users[{0}].username is required")]
    MissingUsername(usize),

    #[error("User {0} is configured more than once")]
    DuplicateUser(String),

    #[error("User {0} has no token")]
    MissingToken(String),

    #[error("User {0} must have a concurrency of at least 1")]
    ZeroConcurrency(String),
}

/// Top-level load test configuration, as read from the YAML file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl Config {
    /// Checks every required field before any user session is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cluster.validate()?;

        if self.users.is_empty() {
            return Err(ConfigError::NoUsers);
        }

        let mut seen = HashSet::new();
        for (idx, user) in self.users.iter().enumerate() {
            if user.username.trim().is_empty() {
                return Err(ConfigError::MissingUsername(idx));
            }
            if !seen.insert(user.username.as_str()) {
                return Err(ConfigError::DuplicateUser(user.username.clone()));
            }
            if user.token.trim().is_empty() {
                return Err(ConfigError::MissingToken(user.username.clone()));
            }
            if user.concurrency == 0 {
                return Err(ConfigError::ZeroConcurrency(user.username.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    #[serde(default)]
    pub api_server: String,
    /// PEM bundle used as the TLS trust anchor.
    #[serde(default)]
    pub ca_path: Option<PathBuf>,
    /// Skip TLS certificate verification entirely.
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub qps: f32,
    #[serde(default)]
    pub burst: u32,
    #[serde(default)]
    pub ignore_resources: Vec<String>,
}

impl ClusterConfig {
    pub fn new(api_server: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into(),
            ca_path: None,
            insecure: false,
            qps: 0.,
            burst: 0,
            ignore_resources: vec![],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_server.trim().is_empty() {
            return Err(ConfigError::MissingApiServer);
        }
        self.api_server_url()?;

        if self.qps < 0. {
            return Err(ConfigError::NegativeQps(self.qps));
        }

        Ok(())
    }

    pub fn api_server_url(&self) -> Result<Url, ConfigError> {
        Ok(Url::parse(self.api_server.trim())?)
    }

    /// Effective QPS, falling back to [`DEFAULT_QPS`] when unset.
    pub fn qps(&self) -> f32 {
        if self.qps > 0. {
            self.qps
        } else {
            DEFAULT_QPS
        }
    }

    /// Effective burst, falling back to [`DEFAULT_BURST`] when unset.
    pub fn burst(&self) -> u32 {
        if self.burst == 0 {
            DEFAULT_BURST
        } else {
            self.burst
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub token: String,
    pub concurrency: usize,
}

impl UserConfig {
    pub fn new(username: impl Into<String>, token: impl Into<String>, concurrency: usize) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
            concurrency,
        }
    }
}

// NOTE: Tokens must never end up in logs.
impl fmt::Debug for UserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserConfig")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("concurrency", &self.concurrency)
            .finish()
    }
}
