// Shared transport configuration for building reqwest::Client instances.
//
// The camera and store clients share timeout and user-agent settings
// through this module, avoiding duplicated builder logic.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::Error;

/// Default user agent sent to every upstream.
pub const DEFAULT_USER_AGENT: &str = concat!("sentinel-proxy/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
///
/// `timeout` bounds the whole request including the body, so it must stay
/// `None` for clients that read an endless camera stream. `connect_timeout`
/// only bounds establishing the connection. `response_timeout` bounds the
/// wait for the status line and headers once connected; the camera client
/// applies it per request.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub response_timeout: Option<Duration>,
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: None,
            timeout: Some(Duration::from_secs(30)),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl TransportConfig {
    /// Transport tuned for long-lived streaming bodies: no whole-request
    /// timeout, and the headers must arrive within `connect_timeout`.
    pub fn streaming(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            response_timeout: Some(connect_timeout),
            timeout: None,
            ..Self::default()
        }
    }

    /// Override how long to wait for response headers.
    #[must_use]
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = Some(response_timeout);
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Build a `reqwest::Client` with additional default headers.
    ///
    /// Used by the store client to inject the `apikey` and bearer headers.
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .default_headers(headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder
            .build()
            .map_err(|e| Error::ClientBuild(e.to_string()))
    }
}
