//! Settings manager for chat-app.
//!
//! Everything is read once at startup from the process environment, which may
//! be pre-seeded from a `.env` file.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum::http::Method;
use tracing::level_filters::LevelFilter;

use crate::AppState;

const ENV_FILE_NAME: &str = ".env";
const DEFAULT_ALLOWED_HOSTS: &[&str] = &["localhost", "127.0.0.1"];
const DEBUG_ALLOWED_HOSTS: &[&str] = &[".localhost", "127.0.0.1", "[::1]"];
const DEFAULT_LOGGER_ROOT_NAME: &str = "chat_app";
const DEFAULT_REQUEST_TIMEOUT: u64 = 10;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_POOL_SIZE: u32 = 10;
const TRUTHY: &[&str] = &["true", "on", "ok", "y", "yes", "1"];

/// Header carrying the correlation ID, inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Methods accepted by the CORS policy.
pub const CORS_ALLOWED_METHODS: [Method; 6] = [
    Method::DELETE,
    Method::GET,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
];

/// Request headers accepted by the CORS policy.
pub const CORS_ALLOWED_HEADERS: [&str; 10] = [
    "accept",
    "accept-encoding",
    "authorization",
    "content-type",
    "dnt",
    "origin",
    "user-agent",
    "x-csrftoken",
    "x-requested-with",
    "x-api-key",
];

/// Errors raised while assembling [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing `{0}` environment variable")]
    Missing(&'static str),
    #[error("`{key}` has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// String that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

/// PostgreSQL connection descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub name: String,
    pub user: String,
    pub password: Secret,
    pub host: String,
    pub port: u16,
    /// Maximum pool connections.
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            name: "chat_app".into(),
            user: "postgres".into(),
            password: Secret::new("postgres"),
            host: "localhost".into(),
            port: 5432,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub secret_key: Secret,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub database: DatabaseSettings,
    /// Level applied to the root logger target and to `general`.
    pub log_level: LevelFilter,
    /// Tracing target whose level is driven by `log_level`.
    pub logger_root_name: String,
    pub request_timeout: Duration,
    pub port: u16,
}

impl Default for Settings {
    /// Development defaults, only meant for tests.
    fn default() -> Self {
        Self {
            secret_key: Secret::new("insecure-development-key"),
            debug: true,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            database: DatabaseSettings::default(),
            log_level: LevelFilter::DEBUG,
            logger_root_name: DEFAULT_LOGGER_ROOT_NAME.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            port: DEFAULT_PORT,
        }
    }
}

impl FromRef<AppState> for Arc<Settings> {
    fn from_ref(state: &AppState) -> Arc<Settings> {
        Arc::clone(&state.settings)
    }
}

/// Load `.env` from `ENV_FILE_PATH` (or the working directory).
///
/// Variables already present in the environment are never overridden.
pub fn load_env_file() -> Result<PathBuf, dotenvy::Error> {
    load_env_file_in(std::env::var_os("ENV_FILE_PATH").map(PathBuf::from))
}

fn load_env_file_in(dir: Option<PathBuf>) -> Result<PathBuf, dotenvy::Error> {
    let path = dir.unwrap_or_default().join(ENV_FILE_NAME);

    dotenvy::from_path(&path)?;
    Ok(path)
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key).ok_or(ConfigError::Missing(key))
        };

        let secret_key = required("SECRET_KEY")?;
        if secret_key.is_empty() {
            return Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                value: secret_key,
            });
        }

        let database = DatabaseSettings {
            name: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: Secret::new(required("DB_PASSWORD")?),
            host: required("DB_HOST")?,
            port: parse("DB_PORT", required("DB_PORT")?)?,
            pool_size: lookup("DB_POOL_SIZE")
                .map(|v| parse("DB_POOL_SIZE", v))
                .transpose()?
                .unwrap_or(DEFAULT_POOL_SIZE),
        };

        let allowed_hosts = match lookup("ALLOWED_HOSTS") {
            Some(hosts) => parse_list(&hosts),
            None => DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        };

        let log_level = match lookup("LOG_LEVEL") {
            Some(level) => parse_level(&level).ok_or(ConfigError::Invalid {
                key: "LOG_LEVEL",
                value: level,
            })?,
            None => LevelFilter::DEBUG,
        };

        Ok(Self {
            secret_key: Secret::new(secret_key),
            debug: lookup("DEBUG").map(|v| parse_bool(&v)).unwrap_or(true),
            allowed_hosts,
            database,
            log_level,
            logger_root_name: lookup("LOGGER_ROOT_NAME")
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOGGER_ROOT_NAME.into()),
            request_timeout: Duration::from_secs(
                lookup("REQUEST_TIMEOUT")
                    .map(|v| parse("REQUEST_TIMEOUT", v))
                    .transpose()?
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            ),
            port: lookup("PORT")
                .map(|v| parse("PORT", v))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),
        })
    }

    /// Host patterns actually enforced.
    ///
    /// An empty list in debug mode falls back to local addresses.
    pub fn effective_allowed_hosts(&self) -> Vec<String> {
        if self.debug && self.allowed_hosts.is_empty() {
            DEBUG_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect()
        } else {
            self.allowed_hosts.clone()
        }
    }
}

fn parse<T: std::str::FromStr>(
    key: &'static str,
    value: String,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    TRUTHY.contains(&value.as_str())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_uppercase().as_str() {
        "TRACE" | "NOTSET" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARN" | "WARNING" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        "OFF" => Some(LevelFilter::OFF),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut map: HashMap<String, String> = [
            ("SECRET_KEY", "s3cr3t"),
            ("DB_NAME", "chat"),
            ("DB_USER", "chat_user"),
            ("DB_PASSWORD", "hunter2"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "5433"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        for (k, v) in pairs {
            map.insert((*k).to_owned(), (*v).to_owned());
        }
        map
    }

    fn load(map: &HashMap<String, String>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&env(&[])).unwrap();

        assert_eq!(settings.secret_key.expose(), "s3cr3t");
        assert!(settings.debug);
        assert_eq!(settings.allowed_hosts, vec!["localhost", "127.0.0.1"]);
        assert_eq!(settings.log_level, LevelFilter::DEBUG);
        assert_eq!(settings.logger_root_name, "chat_app");
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.database.name, "chat");
        assert_eq!(settings.database.user, "chat_user");
        assert_eq!(settings.database.password.expose(), "hunter2");
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.port, 5433);
        assert_eq!(settings.database.pool_size, 10);
    }

    #[test]
    fn test_overrides() {
        let settings = load(&env(&[
            ("DEBUG", "off"),
            ("ALLOWED_HOSTS", "chat.example.com, .example.org,,"),
            ("LOG_LEVEL", "warning"),
            ("LOGGER_ROOT_NAME", "chat"),
            ("REQUEST_TIMEOUT", "30"),
            ("PORT", "9000"),
            ("DB_POOL_SIZE", "4"),
        ]))
        .unwrap();

        assert!(!settings.debug);
        assert_eq!(
            settings.allowed_hosts,
            vec!["chat.example.com", ".example.org"]
        );
        assert_eq!(settings.log_level, LevelFilter::WARN);
        assert_eq!(settings.logger_root_name, "chat");
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.database.pool_size, 4);
    }

    #[test]
    fn test_missing_required() {
        let mut map = env(&[]);
        map.remove("SECRET_KEY");
        assert!(matches!(load(&map), Err(ConfigError::Missing("SECRET_KEY"))));

        let mut map = env(&[]);
        map.remove("DB_PORT");
        assert!(matches!(load(&map), Err(ConfigError::Missing("DB_PORT"))));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&env(&[("REQUEST_TIMEOUT", "ten")])),
            Err(ConfigError::Invalid {
                key: "REQUEST_TIMEOUT",
                ..
            })
        ));
        assert!(matches!(
            load(&env(&[("DB_PORT", "99999")])),
            Err(ConfigError::Invalid { key: "DB_PORT", .. })
        ));
        assert!(matches!(
            load(&env(&[("LOG_LEVEL", "LOUD")])),
            Err(ConfigError::Invalid {
                key: "LOG_LEVEL",
                ..
            })
        ));
        assert!(matches!(
            load(&env(&[("SECRET_KEY", "")])),
            Err(ConfigError::Invalid {
                key: "SECRET_KEY",
                ..
            })
        ));
    }

    #[test]
    fn test_bool_parsing() {
        for value in ["True", "on", "OK", "y", "yes", "1"] {
            assert!(parse_bool(value), "{value} should be true");
        }
        for value in ["false", "0", "no", "", "maybe"] {
            assert!(!parse_bool(value), "{value} should be false");
        }
    }

    #[test]
    fn test_effective_allowed_hosts() {
        let mut settings = Settings {
            allowed_hosts: Vec::new(),
            ..Default::default()
        };
        assert_eq!(
            settings.effective_allowed_hosts(),
            vec![".localhost", "127.0.0.1", "[::1]"]
        );

        settings.debug = false;
        assert!(settings.effective_allowed_hosts().is_empty());
    }

    #[test]
    fn test_load_env_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "CHAT_APP_ENV_FILE_LOADED=yes\nCHAT_APP_ENV_FILE_KEPT=first\n",
        )
        .unwrap();

        let path = load_env_file_in(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(path, dir.path().join(".env"));
        assert_eq!(std::env::var("CHAT_APP_ENV_FILE_LOADED").unwrap(), "yes");

        // Variables already in the environment win over the file.
        let other = tempfile::tempdir().unwrap();
        std::fs::write(
            other.path().join(".env"),
            "CHAT_APP_ENV_FILE_KEPT=second\n",
        )
        .unwrap();
        load_env_file_in(Some(other.path().to_path_buf())).unwrap();
        assert_eq!(std::env::var("CHAT_APP_ENV_FILE_KEPT").unwrap(), "first");
    }

    #[test]
    fn test_missing_env_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load_env_file_in(Some(dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_secret_is_redacted() {
        let settings = load(&env(&[])).unwrap();
        let debug = format!("{settings:?}");

        assert!(!debug.contains("s3cr3t"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[redacted]"));
    }
}
