use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::{DbError, Result};

/// Default number of connections opened when the pool is built.
pub const DEFAULT_POOL_SIZE: usize = 100;

/// Default bound on how long `acquire` waits for a free connection
/// (10 attempts of 500ms).
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: DbConfig,
}

/// Database connection and pool configuration.
///
/// `endpoint`, `port` and the credentials are passed through to the driver;
/// the SQLite driver only uses `database`, which it treats as a file path.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DbConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// Logs every executed statement at info level when set.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_endpoint() -> String {
    "localhost".to_string()
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_acquire_timeout_ms() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_MS
}

impl DbConfig {
    /// Creates a configuration for `database` with default pool settings.
    pub fn new(database: impl Into<String>) -> Self {
        DbConfig {
            endpoint: default_endpoint(),
            port: None,
            username: None,
            password: None,
            database: database.into(),
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            dev_mode: false,
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Total time `acquire` waits before failing with `PoolExhausted`.
    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Checks the settings that the pool cannot work without.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(DbError::Config("pool_size must be at least 1".to_string()));
        }
        if self.database.trim().is_empty() {
            return Err(DbError::Config("database must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parses a configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;
    config.database.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = simpledb::config::load_config("simpledb.toml").expect("Failed to load config");
/// println!("{:?}", config.database);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
