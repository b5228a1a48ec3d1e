//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use sentinel_config::ConfigError;
use sentinel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(sentinel::connection_failed),
        help(
            "Check that the host is up and reachable from this machine.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Camera stream error: {reason}")]
    #[diagnostic(
        code(sentinel::camera_status),
        help("The camera answered with HTTP {status}. It may be busy serving another viewer.")
    )]
    CameraStatus { status: u16, reason: String },

    // ── Store ────────────────────────────────────────────────────────
    #[error("Record store is not configured")]
    #[diagnostic(
        code(sentinel::no_store),
        help(
            "Set store.url with: sentinel config set store.url https://<project>.supabase.co\n\
             Expected config at: {path}"
        )
    )]
    NoStore { path: String },

    #[error("No anon key configured for the record store")]
    #[diagnostic(
        code(sentinel::no_store_key),
        help(
            "Store one with: sentinel config set-key\n\
             Or set the SENTINEL_STORE_KEY environment variable."
        )
    )]
    NoStoreKey,

    #[error("Record store rejected the credentials: {message}")]
    #[diagnostic(
        code(sentinel::auth_failed),
        help("Check the anon key. Run: sentinel config set-key")
    )]
    AuthFailed { message: String },

    #[error("Store error ({code}): {message}")]
    #[diagnostic(code(sentinel::store_error))]
    StoreError { code: String, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sentinel::not_found),
        help("Run: sentinel {list_command} to see available records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sentinel::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(sentinel::config))]
    Config(Box<figment::Error>),

    #[error("Failed to write configuration: {0}")]
    #[diagnostic(code(sentinel::config_write))]
    ConfigWrite(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(sentinel::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(sentinel::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(sentinel::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::CameraStatus { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoStoreKey => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UpstreamUnreachable { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::UpstreamStatus { status, reason } => {
                CliError::CameraStatus { status, reason }
            }

            CoreError::StreamInterrupted { reason } => CliError::ConnectionFailed {
                url: "(stream)".into(),
                reason,
            },

            CoreError::Store {
                message,
                status: Some(401 | 403),
                ..
            } => CliError::AuthFailed { message },

            CoreError::Store {
                message,
                code,
                status,
            } => CliError::StoreError {
                code: code
                    .or_else(|| status.map(|s| format!("HTTP {s}")))
                    .unwrap_or_else(|| "unknown".into()),
                message,
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{}s list", entity_type.to_lowercase()),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoStoreKey => CliError::NoStoreKey,
            ConfigError::NoStoreUrl => CliError::NoStore {
                path: sentinel_config::config_path().display().to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::ConfigWrite(e.to_string()),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
