// ── Core error types ──
//
// Domain errors from sentinel-core. The HTTP server and the CLI match on
// these; neither sees reqwest errors or PostgREST payloads directly.
// The `From<sentinel_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Upstream (camera or store) ───────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    UpstreamUnreachable { url: String, reason: String },

    #[error("Camera stream error: {reason}")]
    UpstreamStatus { status: u16, reason: String },

    #[error("Stream interrupted: {reason}")]
    StreamInterrupted { reason: String },

    // ── Records ──────────────────────────────────────────────────────
    #[error("{message}")]
    Store {
        message: String,
        /// PostgREST error code (e.g. `PGRST116`).
        code: Option<String>,
        status: Option<u16>,
    },

    #[error("{entity_type} '{identifier}' not found")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a missing record.
    pub fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sentinel_api::Error> for CoreError {
    fn from(err: sentinel_api::Error) -> Self {
        match err {
            sentinel_api::Error::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_connect() || e.is_timeout() {
                    CoreError::UpstreamUnreachable {
                        url,
                        reason: e.to_string(),
                    }
                } else if e.is_body() || e.is_decode() {
                    CoreError::StreamInterrupted {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Store {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            sentinel_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sentinel_api::Error::ClientBuild(msg) => CoreError::Config {
                message: format!("Failed to build HTTP client: {msg}"),
            },
            sentinel_api::Error::ResponseTimeout { url, after } => {
                CoreError::UpstreamUnreachable {
                    url,
                    reason: format!("no response within {}s", after.as_secs_f64()),
                }
            }
            sentinel_api::Error::InvalidHeader { name, reason } => CoreError::Config {
                message: format!("Invalid {name} header: {reason}"),
            },
            sentinel_api::Error::UpstreamStatus { status, reason } => {
                CoreError::UpstreamStatus { status, reason }
            }
            sentinel_api::Error::Store {
                message,
                code,
                status,
            } => CoreError::Store {
                message,
                code,
                status: Some(status),
            },
            sentinel_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
