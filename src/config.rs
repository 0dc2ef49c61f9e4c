//! Application-level configuration loading: listener, CORS, store backend and announcer.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::services::announcer::AnnouncerConfig;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLICKER_BACK_CONFIG_PATH";
/// Port used when neither the file nor `PORT` sets one.
const DEFAULT_PORT: u16 = 5000;

/// Score store implementation selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; scores are lost on restart.
    #[default]
    Memory,
    /// PostgreSQL table configured through `DATABASE_URL`.
    Postgres,
}

/// Unknown `STORE_BACKEND` value.
#[derive(Debug, Error)]
#[error("unknown store backend `{0}` (expected `memory` or `postgres`)")]
pub struct UnknownBackend(String);

impl FromStr for StoreBackend {
    type Err = UnknownBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            _ => Err(UnknownBackend(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// TCP port the HTTP server listens on.
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Score store backend.
    pub backend: StoreBackend,
    /// Announcement pipeline settings.
    pub announcer: AnnouncerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            backend: StoreBackend::default(),
            announcer: AnnouncerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load the configuration file, falling back to defaults, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file();
        config.apply_env(|name| env::var(name).ok());
        config
    }

    fn from_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        webhooks = app_config.announcer.webhooks.len(),
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Override fields from `PORT`, `ALLOWED_ORIGINS` and `STORE_BACKEND` as returned by `lookup`.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PORT") {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid PORT"),
            }
        }

        if let Some(raw) = lookup("ALLOWED_ORIGINS") {
            self.allowed_origins = parse_origins(&raw);
        }

        if let Some(raw) = lookup("STORE_BACKEND") {
            match raw.parse::<StoreBackend>() {
                Ok(backend) => self.backend = backend,
                Err(err) => warn!(error = %err, "ignoring invalid STORE_BACKEND"),
            }
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    allowed_origins: Vec<String>,
    backend: Option<StoreBackend>,
    announcer: AnnouncerConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            port: value.port.unwrap_or(DEFAULT_PORT),
            allowed_origins: value.allowed_origins,
            backend: value.backend.unwrap_or_default(),
            announcer: value.announcer,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
