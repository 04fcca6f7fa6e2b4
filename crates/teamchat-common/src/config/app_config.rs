//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when one
//! is present).

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub jwt: JwtConfig,
    pub realtime: RealtimeConfig,
    pub directory: DirectoryConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime in seconds of tokens issued by this process
    #[serde(default = "default_token_expiry")]
    pub token_expiry: i64,
}

/// Tuning of the real-time core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Delay before a user with no live connection is declared offline
    pub presence_grace: Duration,
    /// A typing indicator with no refresh is cleared after this long
    pub typing_timeout: Duration,
    /// Upper bound on every collaborator call
    pub collaborator_timeout: Duration,
    /// Frames queued per connection before events start being dropped
    pub outbound_buffer: usize,
    /// Dropped events after which a slow connection is evicted
    pub max_dropped_events: u32,
    /// A connection with no inbound frame for this long is closed
    pub idle_timeout: Duration,
    pub hub_command_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            presence_grace: Duration::from_millis(default_presence_grace_ms()),
            typing_timeout: Duration::from_millis(default_typing_timeout_ms()),
            collaborator_timeout: Duration::from_millis(default_collaborator_timeout_ms()),
            outbound_buffer: default_outbound_buffer(),
            max_dropped_events: default_max_dropped_events(),
            idle_timeout: Duration::from_millis(default_idle_timeout_ms()),
            hub_command_buffer: default_hub_command_buffer(),
        }
    }
}

/// In-memory directory used by the development binary
#[derive(Debug, Clone, Default)]
pub struct DirectoryConfig {
    /// JSON seed file with users, workspaces and channels
    pub seed_path: Option<PathBuf>,
}

// Default value functions
fn default_app_name() -> String {
    "teamchat".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_token_expiry() -> i64 {
    604_800 // 7 days
}

fn default_presence_grace_ms() -> u64 {
    8_000
}

fn default_typing_timeout_ms() -> u64 {
    5_000
}

fn default_collaborator_timeout_ms() -> u64 {
    3_000
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_max_dropped_events() -> u32 {
    100
}

fn default_idle_timeout_ms() -> u64 {
    90_000
}

fn default_hub_command_buffer() -> usize {
    1024
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or
    /// a value cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Same as [`AppConfig::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV") {
            Some(value) => Environment::parse(&value)
                .ok_or(ConfigError::InvalidValue("APP_ENV", value))?,
            None => default_env(),
        };

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: environment,
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: required(&lookup, "GATEWAY_PORT")?,
            },
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                token_expiry: parse_or(&lookup, "JWT_TOKEN_EXPIRY", default_token_expiry)?,
            },
            realtime: RealtimeConfig {
                presence_grace: millis_or(&lookup, "PRESENCE_GRACE_MS", default_presence_grace_ms)?,
                typing_timeout: millis_or(&lookup, "TYPING_TIMEOUT_MS", default_typing_timeout_ms)?,
                collaborator_timeout: millis_or(
                    &lookup,
                    "COLLABORATOR_TIMEOUT_MS",
                    default_collaborator_timeout_ms,
                )?,
                outbound_buffer: parse_or(&lookup, "OUTBOUND_BUFFER", default_outbound_buffer)?,
                max_dropped_events: parse_or(
                    &lookup,
                    "MAX_DROPPED_EVENTS",
                    default_max_dropped_events,
                )?,
                idle_timeout: millis_or(&lookup, "IDLE_TIMEOUT_MS", default_idle_timeout_ms)?,
                hub_command_buffer: parse_or(
                    &lookup,
                    "HUB_COMMAND_BUFFER",
                    default_hub_command_buffer,
                )?,
            },
            directory: DirectoryConfig {
                seed_path: lookup("DIRECTORY_SEED").map(PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let realtime = &self.realtime;
        if realtime.outbound_buffer == 0 {
            return Err(ConfigError::InvalidValue("OUTBOUND_BUFFER", "0".to_string()));
        }
        if realtime.max_dropped_events == 0 {
            return Err(ConfigError::InvalidValue("MAX_DROPPED_EVENTS", "0".to_string()));
        }
        if realtime.hub_command_buffer == 0 {
            return Err(ConfigError::InvalidValue("HUB_COMMAND_BUFFER", "0".to_string()));
        }
        if realtime.collaborator_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("COLLABORATOR_TIMEOUT_MS", "0".to_string()));
        }
        if realtime.idle_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("IDLE_TIMEOUT_MS", "0".to_string()));
        }
        Ok(())
    }
}

fn required<T, F>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::MissingVar(key))?;
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key, raw))
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

fn millis_or<F>(lookup: &F, key: &'static str, default: fn() -> u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default).map(Duration::from_millis)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("GATEWAY_PORT", "5000"), ("JWT_SECRET", "s")]))
                .unwrap();

        assert_eq!(config.app.name, "teamchat");
        assert_eq!(config.app.env, Environment::Development);
        assert_eq!(config.gateway.address(), "127.0.0.1:5000");
        assert_eq!(config.jwt.token_expiry, 604_800);
        assert_eq!(config.realtime, RealtimeConfig::default());
        assert_eq!(config.realtime.presence_grace, Duration::from_secs(8));
        assert!(config.directory.seed_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "Production"),
            ("GATEWAY_PORT", "5000"),
            ("JWT_SECRET", "s"),
            ("PRESENCE_GRACE_MS", "250"),
            ("OUTBOUND_BUFFER", "8"),
            ("DIRECTORY_SEED", "/tmp/seed.json"),
        ]))
        .unwrap();

        assert!(config.app.env.is_production());
        assert_eq!(config.realtime.presence_grace, Duration::from_millis(250));
        assert_eq!(config.realtime.outbound_buffer, 8);
        assert_eq!(config.directory.seed_path, Some(PathBuf::from("/tmp/seed.json")));
    }

    #[test]
    fn test_missing_required_vars() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("GATEWAY_PORT")));

        let err = AppConfig::from_lookup(lookup_from(&[("GATEWAY_PORT", "5000")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("JWT_SECRET")));
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("GATEWAY_PORT", "5000"),
            ("JWT_SECRET", "s"),
            ("TYPING_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("TYPING_TIMEOUT_MS", _)));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("GATEWAY_PORT", "5000"),
            ("JWT_SECRET", "s"),
            ("OUTBOUND_BUFFER", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("OUTBOUND_BUFFER", _)));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("GATEWAY_PORT", "5000"),
            ("JWT_SECRET", "s"),
            ("IDLE_TIMEOUT_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("IDLE_TIMEOUT_MS", _)));
    }
}
