//! Client for a camera's raw multipart MJPEG endpoint.
//!
//! The camera (or another relay in front of it) exposes a single
//! long-lived HTTP response whose body is a sequence of JPEG frames.
//! This client only opens that response and hands out its body as a
//! byte stream; frame boundaries are left to whoever renders it.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{CONNECTION, HeaderValue};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Async client for one fixed stream URL.
#[derive(Debug, Clone)]
pub struct CameraClient {
    http: reqwest::Client,
    stream_url: Url,
    response_timeout: Option<Duration>,
}

impl CameraClient {
    /// Build a client for `stream_url` from a transport config.
    ///
    /// Use [`TransportConfig::streaming`] so the body is never cut off
    /// by a whole-request timeout.
    pub fn new(stream_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let mut client = Self::from_reqwest(stream_url, http)?;
        client.response_timeout = transport.response_timeout;
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client`. No header timeout is applied.
    pub fn from_reqwest(stream_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let stream_url = Url::parse(stream_url)?;
        Ok(Self {
            http,
            stream_url,
            response_timeout: None,
        })
    }

    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    /// Open the stream.
    ///
    /// `cache_bust` is appended as `?cb=<token>` so intermediaries never
    /// serve a stale response. A non-success status is returned as
    /// [`Error::UpstreamStatus`] without touching the body. A camera that
    /// accepts the connection but never answers fails with
    /// [`Error::ResponseTimeout`].
    pub async fn open(&self, cache_bust: Option<u64>) -> Result<CameraStream, Error> {
        let mut url = self.stream_url.clone();
        if let Some(token) = cache_bust {
            url.query_pairs_mut().append_pair("cb", &token.to_string());
        }
        debug!("GET {url}");

        let request = self
            .http
            .get(url.clone())
            .header(CONNECTION, HeaderValue::from_static("keep-alive"))
            .send();

        let resp = match self.response_timeout {
            Some(after) => tokio::time::timeout(after, request)
                .await
                .map_err(|_| Error::ResponseTimeout {
                    url: url.to_string(),
                    after,
                })??,
            None => request.await?,
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .map_or_else(|| status.as_str().to_owned(), str::to_owned),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(CameraStream {
            content_type,
            body: Box::pin(resp.bytes_stream()),
        })
    }
}

/// An open camera response.
///
/// Owns the underlying connection; dropping it closes the connection.
pub struct CameraStream {
    content_type: Option<String>,
    body: std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
}

impl CameraStream {
    /// Content type the camera announced, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Read the next chunk; `Ok(None)` at end of stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self.body.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(Error::Transport(e)),
            None => Ok(None),
        }
    }

    /// Turn the response into a plain byte stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Error>> + Send + Unpin {
        self.body.map(|item| item.map_err(Error::Transport))
    }
}

impl std::fmt::Debug for CameraStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStream")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
