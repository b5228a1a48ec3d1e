//! Shared configuration for the SentinelPro server and CLI.
//!
//! One TOML file, layered under `SENTINEL_` environment variables, plus
//! store-key resolution (env + keyring + plaintext) and translation into
//! `sentinel_api` clients. The CLI applies its own flag overrides on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sentinel_api::{CameraClient, StoreClient, TransportConfig};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "sentinel";

/// Keyring entry holding the store's anon key.
pub const KEYRING_STORE_KEY: &str = "store/anon-key";

/// Env var consulted for the store key when `anon_key_env` is unset or empty.
pub const STORE_KEY_ENV: &str = "SENTINEL_STORE_KEY";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no store key configured")]
    NoStoreKey,

    #[error("store URL is not configured")]
    NoStoreUrl,

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:3000".
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| ConfigError::Validation {
            field: "server.bind".into(),
            reason: format!("expected host:port, got '{}'", self.bind),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Upstream MJPEG endpoint.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Multipart boundary advertised to clients.
    #[serde(default = "default_boundary")]
    pub boundary: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a connected camera may take to send its response headers.
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    /// Override the upstream User-Agent.
    pub user_agent: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            stream_url: default_stream_url(),
            boundary: default_boundary(),
            connect_timeout_secs: default_connect_timeout(),
            response_timeout_secs: default_response_timeout(),
            user_agent: None,
        }
    }
}

impl CameraConfig {
    /// Streaming transport: connect and header timeouts, no whole-request limit.
    pub fn transport(&self) -> TransportConfig {
        let mut transport =
            TransportConfig::streaming(Duration::from_secs(self.connect_timeout_secs))
                .with_response_timeout(Duration::from_secs(self.response_timeout_secs));
        if let Some(ref ua) = self.user_agent {
            transport.user_agent.clone_from(ua);
        }
        transport
    }

    pub fn client(&self) -> Result<CameraClient, ConfigError> {
        self.validate()?;
        CameraClient::new(&self.stream_url, &self.transport()).map_err(|e| {
            ConfigError::Validation {
                field: "camera.stream_url".into(),
                reason: e.to_string(),
            }
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("camera.stream_url", &self.stream_url)?;
        if self.boundary.is_empty() || self.boundary.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation {
                field: "camera.boundary".into(),
                reason: format!("'{}' is not a valid multipart boundary", self.boundary),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Project URL; the `/rest/v1` suffix is added automatically.
    pub url: Option<String>,

    /// Anon key (plaintext; prefer keyring or env var).
    pub anon_key: Option<String>,

    /// Environment variable name containing the anon key.
    pub anon_key_env: Option<String>,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            anon_key_env: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: Some(Duration::from_secs(self.timeout_secs)),
            ..TransportConfig::default()
        }
    }

    /// Build a client with the resolved key.
    pub fn client(&self) -> Result<StoreClient, ConfigError> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::NoStoreUrl)?;
        validate_http_url("store.url", url)?;
        let key = resolve_store_key(self)?;
        StoreClient::from_key(url, &key, &self.transport()).map_err(|e| ConfigError::Validation {
            field: "store".into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Stream to watch; defaults to the local relay.
    #[serde(default = "default_watch_url")]
    pub url: String,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            url: default_watch_url(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl WatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_stream_url() -> String {
    "http://192.168.68.151:81/stream".into()
}
fn default_boundary() -> String {
    "frame".into()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_response_timeout() -> u64 {
    10
}
fn default_store_timeout() -> u64 {
    30
}
fn default_watch_url() -> String {
    "http://127.0.0.1:3000/proxy-stream".into()
}
fn default_retry_delay() -> u64 {
    5
}

fn validate_http_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("expected http or https, got '{other}'"),
        }),
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sentinel", "sentinel").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sentinel");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SENTINEL_").split("__"))
}

/// Load config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` + environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(figment_for(path).extract()?)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Store key resolution ────────────────────────────────────────────

/// Resolve the store's anon key.
///
/// Order: `anon_key_env` → `SENTINEL_STORE_KEY` → system keyring →
/// plaintext `anon_key`.
pub fn resolve_store_key(store: &StoreConfig) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = store.anon_key_env {
        if let Some(val) = non_empty_env(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(val) = non_empty_env(STORE_KEY_ENV) {
        return Ok(SecretString::from(val));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_STORE_KEY) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref key) = store.anon_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoStoreKey)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
