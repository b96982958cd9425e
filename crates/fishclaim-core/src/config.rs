//! FishClaim Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. The resulting [`AppConfig`] is passed
//! explicitly to the components that need it; nothing below the binary reads
//! the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum signing secret length in bytes (256 bits)
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound on the access token lifetime (one day)
pub const MAX_ACCESS_TOKEN_MINUTES: u64 = 24 * 60;

/// Upper bound on the refresh token lifetime
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

/// Largest Argon2 memory cost accepted for hashing or verification (256 MiB)
pub const MAX_HASH_MEMORY_KIB: u32 = 256 * 1024;

/// Largest Argon2 iteration count accepted for hashing or verification
pub const MAX_HASH_TIME_COST: u32 = 16;

/// Largest Argon2 lane count accepted for hashing or verification
pub const MAX_HASH_PARALLELISM: u32 = 16;

/// Environment variable naming an optional TOML config file
pub const CONFIG_FILE_ENV: &str = "FISHCLAIM_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Persistence configuration
    pub database: DatabaseConfig,

    /// Token and credential configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// When `FISHCLAIM_CONFIG` names a TOML file it is loaded first and the
    /// environment overrides it. `SECRET_KEY` is required, from the file or
    /// the environment; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();

        match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path, lookup),
            None => Self::from_lookup(lookup),
        }
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().finish(false, &lookup)
    }

    /// Load a TOML file, then apply overrides from `lookup`
    pub fn from_file<F>(path: impl Into<PathBuf>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml(&content, &lookup).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    fn from_toml<F>(content: &str, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_error = |e: toml::de::Error| ConfigError::ParseError {
            path: PathBuf::new(),
            message: e.to_string(),
        };

        let table: toml::Table = toml::from_str(content).map_err(parse_error)?;
        let has_secret = table
            .get("auth")
            .and_then(|auth| auth.get("secret_key"))
            .is_some();

        let config: Self = toml::Value::Table(table)
            .try_into()
            .map_err(parse_error)?;

        config.finish(has_secret, lookup)
    }

    /// Apply overrides, enforce the required secret and validate
    fn finish<F>(mut self, has_secret: bool, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_overrides(lookup)?;

        if !has_secret && lookup("SECRET_KEY").is_none() {
            return Err(ConfigError::MissingRequired("SECRET_KEY".to_string()));
        }

        self.validate()?;
        Ok(self)
    }

    fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }

        // Database
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // Auth
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(algorithm) = lookup("ALGORITHM") {
            self.auth.algorithm = algorithm.parse()?;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(minutes) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes =
                parse_value("ACCESS_TOKEN_EXPIRE_MINUTES", minutes)?;
        }
        if let Some(days) = lookup("REFRESH_TOKEN_EXPIRE_DAYS") {
            self.auth.refresh_token_expire_days = parse_value("REFRESH_TOKEN_EXPIRE_DAYS", days)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub url: Option<String>,

    /// Connection pool size
    pub max_connections: u32,

    /// How long a query may wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// HMAC algorithm used to sign access tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl std::str::FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            _ => Err(ConfigError::InvalidValue {
                key: "ALGORITHM".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Argon2 cost parameters for credential hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB)
    pub memory_cost: u32,
    /// Iterations
    pub time_cost: u32,
    /// Lanes
    pub parallelism: u32,
}

impl HashingConfig {
    /// Reject costs above the verification ceilings, so every stored hash
    /// stays verifiable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("auth.hashing.memory_cost", self.memory_cost, MAX_HASH_MEMORY_KIB),
            ("auth.hashing.time_cost", self.time_cost, MAX_HASH_TIME_COST),
            ("auth.hashing.parallelism", self.parallelism, MAX_HASH_PARALLELISM),
        ];

        for (key, value, max) in checks {
            if value == 0 || value > max {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Token and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Symmetric secret for access token signatures
    pub secret_key: String,

    /// Signing algorithm
    pub algorithm: SigningAlgorithm,

    /// `iss` claim written into and required from access tokens
    pub issuer: String,

    /// Access token lifetime
    pub access_token_expire_minutes: u64,

    /// Refresh token lifetime
    pub refresh_token_expire_days: i64,

    /// Revoke every descendant of a rotated refresh token when it is replayed
    pub revoke_chain_on_reuse: bool,

    /// Credential hashing cost
    pub hashing: HashingConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "development-secret-key-change-in-production".to_string(),
            algorithm: SigningAlgorithm::HS256,
            issuer: "fishclaim-api".to_string(),
            access_token_expire_minutes: 15,
            refresh_token_expire_days: 7,
            revoke_chain_on_reuse: true,
            hashing: HashingConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn access_ttl_secs(&self) -> u64 {
        self.access_token_expire_minutes * 60
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue {
                key: "SECRET_KEY".to_string(),
                value: format!("<{} bytes, need at least {MIN_SECRET_LEN}>", self.secret_key.len()),
            });
        }
        if !(1..=MAX_ACCESS_TOKEN_MINUTES).contains(&self.access_token_expire_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                value: self.access_token_expire_minutes.to_string(),
            });
        }
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&self.refresh_token_expire_days) {
            return Err(ConfigError::InvalidValue {
                key: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                value: self.refresh_token_expire_days.to_string(),
            });
        }
        self.hashing.validate()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
