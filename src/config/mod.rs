//! Configuration: endpoints, the `config.json` file, and HTTP settings from env.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::auth::OAuthApp;
use crate::error::{BbError, Result};
use crate::util::fs::atomic_write;

pub const APP_NAME: &str = "bitbucket-cli";
pub const API_BASE: &str = "https://api.bitbucket.org/2.0";
pub const AUTH_URL: &str = "https://bitbucket.org/site/oauth2/authorize";
pub const TOKEN_URL: &str = "https://bitbucket.org/site/oauth2/access_token";

/// Request timeout used when `BB_HTTP_TIMEOUT` is unset or invalid.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CONFIG_FILE_NAME: &str = "config.json";

/// Output format for command results.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// User configuration persisted as `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_workspace: String,
    #[serde(default, deserialize_with = "lenient_format")]
    pub default_format: OutputFormat,
    /// OAuth consumer key.
    #[serde(default)]
    pub oauth_key: String,
    /// OAuth consumer secret.
    #[serde(default)]
    pub oauth_secret: String,
}

impl Config {
    /// Load `config.json` from `dir`. A missing file yields defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(BbError::Io(err)),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn load_default() -> Result<Self> {
        Self::load(&config_dir())
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(self)?;
        atomic_write(&dir.join(CONFIG_FILE_NAME), &serialized)?;
        Ok(())
    }

    pub fn save_default(&self) -> Result<()> {
        self.save(&config_dir())
    }

    /// OAuth consumer credentials, only when both halves are configured.
    pub fn oauth_app(&self) -> Option<OAuthApp> {
        if self.oauth_key.is_empty() || self.oauth_secret.is_empty() {
            return None;
        }
        Some(OAuthApp::new(&self.oauth_key, &self.oauth_secret))
    }
}

// Older files store an empty string when no format was chosen.
fn lenient_format<'de, D>(deserializer: D) -> std::result::Result<OutputFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if raw.is_empty() {
        return Ok(OutputFormat::default());
    }
    raw.parse().map_err(serde::de::Error::custom)
}

/// Directory holding `config.json` and `token.json`.
///
/// `BB_CONFIG_DIR` overrides the default `~/.config/bitbucket-cli`.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("BB_CONFIG_DIR").filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_NAME))
}

/// Transport settings for the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_base: API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpSettings {
    /// Resolve from `BB_API_BASE` and `BB_HTTP_TIMEOUT` (seconds), after loading `.env`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let api_base = std::env::var("BB_API_BASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| API_BASE.to_string());
        Self {
            api_base,
            timeout: parse_timeout(std::env::var("BB_HTTP_TIMEOUT").ok().as_deref()),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP client carrying the overall per-request timeout.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("bb/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}

/// Parse a positive number of seconds, falling back to [`DEFAULT_TIMEOUT`].
pub fn parse_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.default_format, OutputFormat::Table);
    }

    #[test]
    fn config_round_trip_works() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            default_workspace: "acme".to_string(),
            default_format: OutputFormat::Json,
            oauth_key: "key".to_string(),
            oauth_secret: "secret".to_string(),
        };
        config.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn empty_format_falls_back_to_table() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"default_workspace":"acme","default_format":""}"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.default_format, OutputFormat::Table);
        assert_eq!(config.default_workspace, "acme");
    }

    #[test]
    fn unknown_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"default_format":"yaml"}"#).unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(BbError::Serialization(_))
        ));
    }

    #[test]
    fn oauth_app_requires_key_and_secret() {
        let mut config = Config {
            oauth_key: "key".to_string(),
            ..Config::default()
        };
        assert!(config.oauth_app().is_none());
        config.oauth_secret = "secret".to_string();
        assert_eq!(config.oauth_app(), Some(OAuthApp::new("key", "secret")));
    }

    #[test]
    fn timeout_parsing_ignores_invalid_values() {
        assert_eq!(parse_timeout(None), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("abc")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("0")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("-5")), DEFAULT_TIMEOUT);
        assert_eq!(parse_timeout(Some("90")), Duration::from_secs(90));
    }
}
