use thiserror::Error;

/// Top-level error type for the `sentinel-api` crate.
///
/// Covers every failure mode across both upstream surfaces:
/// the camera's MJPEG endpoint and the PostgREST record store.
/// `sentinel-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Connected, but no response headers arrived in time.
    #[error("No response from {url} within {}s", .after.as_secs_f64())]
    ResponseTimeout {
        url: String,
        after: std::time::Duration,
    },

    /// A header value could not be encoded (e.g. a key with control characters).
    #[error("Invalid header value for {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    // ── Camera stream ───────────────────────────────────────────────
    /// The camera answered with a non-success status.
    #[error("Camera stream error (HTTP {status}): {reason}")]
    UpstreamStatus { status: u16, reason: String },

    // ── Record store ────────────────────────────────────────────────
    /// Structured error from the PostgREST store.
    #[error("Store error (HTTP {status}): {message}")]
    Store {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::ResponseTimeout { .. } => true,
            Self::UpstreamStatus { status, .. } | Self::Store { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::UpstreamStatus { status: 404, .. } => true,
            // PostgREST answers a singular request that matched zero rows with
            // PGRST116. A bare 404 from the store means a missing table or route.
            Self::Store { code: Some(code), .. } => code == "PGRST116",
            _ => false,
        }
    }

    /// Returns `true` if the request never reached a responding server.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::ResponseTimeout { .. } => true,
            _ => false,
        }
    }

    /// Extract the store error code, if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Store { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
