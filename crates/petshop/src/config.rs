//! Process configuration: database connection and application switches.
//!
//! Both structs deserialize from TOML (the CLI reads a file) and can be built
//! from environment variables. Lookups go through a closure so tests never
//! touch the real process environment.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_POOL_MAX_SIZE: usize = 16;

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

/// TLS mode for backend connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SslMode {
    Disable,
    Require,
}

impl SslMode {
    /// `disable` for `localhost`, `require` for everything else.
    pub fn for_host(host: &str) -> Self {
        if host == "localhost" {
            SslMode::Disable
        } else {
            SslMode::Require
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
        }
    }
}

/// How the like toggle protects the counter / relation pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Counter and relation writes share one transaction.
    #[default]
    Transactional,
    /// Independent writes; a relation failure after the counter write is
    /// reported as a partial failure.
    BestEffort,
}

impl FromStr for ConsistencyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" => Ok(Self::Transactional),
            "best_effort" | "best-effort" => Ok(Self::BestEffort),
            other => Err(invalid(
                "LIKE_CONSISTENCY",
                format!("expected transactional or best_effort, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for ConsistencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transactional => "transactional",
            Self::BestEffort => "best_effort",
        })
    }
}

/// Database connection settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Explicit TLS mode; derived from `host` when unset.
    pub ssl_mode: Option<SslMode>,
    pub pool_max_size: usize,
    pub statement_timeout_ms: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            database: String::new(),
            ssl_mode: None,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            statement_timeout_ms: None,
        }
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode())
            .field("pool_max_size", &self.pool_max_size)
            .field("statement_timeout_ms", &self.statement_timeout_ms)
            .finish()
    }
}

impl DbConfig {
    /// Read `DB_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(host) = get("DB_HOST") {
            cfg.host = host;
        }
        if let Some(port) = get("DB_PORT") {
            cfg.port = port
                .trim()
                .parse()
                .map_err(|e| invalid("DB_PORT", format!("{port:?}: {e}")))?;
        }
        cfg.username = get("DB_USERNAME").unwrap_or_default();
        cfg.password = lookup("DB_PASSWORD").unwrap_or_default();
        cfg.database = get("DB_NAME").unwrap_or_default();
        if let Some(size) = get("DB_POOL_MAX_SIZE") {
            cfg.pool_max_size = size
                .trim()
                .parse()
                .map_err(|e| invalid("DB_POOL_MAX_SIZE", format!("{size:?}: {e}")))?;
        }
        if let Some(ms) = get("DB_STATEMENT_TIMEOUT_MS") {
            cfg.statement_timeout_ms = Some(
                ms.trim()
                    .parse()
                    .map_err(|e| invalid("DB_STATEMENT_TIMEOUT_MS", format!("{ms:?}: {e}")))?,
            );
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("DB_HOST"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("DB_USERNAME"));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing("DB_NAME"));
        }
        if self.pool_max_size == 0 {
            return Err(invalid("DB_POOL_MAX_SIZE", "must be at least 1"));
        }
        Ok(())
    }

    pub fn ssl_mode(&self) -> SslMode {
        self.ssl_mode.unwrap_or_else(|| SslMode::for_host(&self.host))
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Driver configuration for these settings.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.username)
            .password(&self.password)
            .dbname(&self.database)
            .ssl_mode(match self.ssl_mode() {
                SslMode::Disable => tokio_postgres::config::SslMode::Disable,
                SslMode::Require => tokio_postgres::config::SslMode::Require,
            });
        pg
    }

    /// Key/value connection string with the password masked, for logs.
    pub fn redacted_dsn(&self) -> String {
        format!(
            "host={} port={} user={} password=*** dbname={} sslmode={}",
            self.host,
            self.port,
            self.username,
            self.database,
            self.ssl_mode().as_str()
        )
    }
}

/// Application-level switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment environment name.
    pub env: String,
    /// Expected client-id header value, when the deployment sets one.
    pub client_id_header: Option<String>,
    pub enable_tracing: bool,
    pub like_consistency: ConsistencyMode,
    pub database: DbConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            client_id_header: None,
            enable_tracing: false,
            like_consistency: ConsistencyMode::default(),
            database: DbConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self {
            database: DbConfig::from_lookup(&lookup)?,
            ..Self::default()
        };

        if let Some(env) = get("APP_ENV") {
            cfg.env = env;
        }
        cfg.client_id_header = get("SBCNTR_CLIENT_ID_HEADER");
        cfg.enable_tracing = get("SBCNTR_ENABLE_TRACING")
            .is_some_and(|v| matches!(v.trim(), "true" | "1"));
        if let Some(mode) = get("LIKE_CONSISTENCY") {
            cfg.like_consistency = mode.parse()?;
        }
        Ok(cfg)
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
