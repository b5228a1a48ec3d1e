//! MJPEG stream relay.
//!
//! Each client request gets its own relay task. The task owns exactly one
//! upstream byte stream and one outbound channel sender; both are moved
//! into the task and dropped when it returns, so the upstream connection
//! is released on every exit path (end of stream, upstream error, client
//! gone, server shutdown).
//!
//! Chunks are forwarded in arrival order without inspection. The outbound
//! channel is bounded, so a slow client applies backpressure to the
//! upstream read instead of growing a buffer.

use std::fmt::Display;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sentinel_api::CameraClient;

use crate::error::CoreError;

/// Outbound buffer between the relay task and the HTTP body, in chunks.
pub const RELAY_CHANNEL_CAPACITY: usize = 16;

/// The body half of a relay: a stream of chunks ending with the upstream.
///
/// An `Err` item means the upstream failed mid-stream; HTTP servers abort
/// the response on it so the client sees a truncated body.
pub type RelayBody = ReceiverStream<Result<Bytes, io::Error>>;

// ── Outcome ──────────────────────────────────────────────────────────

/// How a relay task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream signalled end of stream; the client got everything.
    Completed { chunks: u64, bytes: u64 },
    /// Upstream read failed; the outbound body was terminated with an error.
    UpstreamFailed {
        chunks: u64,
        bytes: u64,
        reason: String,
    },
    /// The client went away; upstream was dropped without further reads.
    ClientGone { chunks: u64, bytes: u64 },
    /// The server is shutting down.
    Cancelled { chunks: u64, bytes: u64 },
}

// ── Stats ────────────────────────────────────────────────────────────

/// Lock-free counters shared by all relays of one server.
#[derive(Debug, Default)]
pub struct RelayStats {
    active: AtomicUsize,
    started: AtomicU64,
    bytes: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStatsSnapshot {
    pub active_relays: usize,
    pub relays_started: u64,
    pub bytes_relayed: u64,
}

impl RelayStats {
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            active_relays: self.active.load(Ordering::Relaxed),
            relays_started: self.started.load(Ordering::Relaxed),
            bytes_relayed: self.bytes.load(Ordering::Relaxed),
        }
    }

    fn enter(self: &Arc<Self>) -> ActiveGuard {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.started.fetch_add(1, Ordering::Relaxed);
        ActiveGuard(Arc::clone(self))
    }
}

/// Holds one slot of the active-relay gauge for the task's lifetime.
struct ActiveGuard(Arc<RelayStats>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

// ── StreamRelay ──────────────────────────────────────────────────────

/// Opens relays from one fixed camera.
///
/// Cheaply cloneable; every clone shares the counters and the shutdown token.
#[derive(Debug, Clone)]
pub struct StreamRelay {
    camera: CameraClient,
    stats: Arc<RelayStats>,
    shutdown: CancellationToken,
}

impl StreamRelay {
    pub fn new(camera: CameraClient, shutdown: CancellationToken) -> Self {
        Self {
            camera,
            stats: Arc::new(RelayStats::default()),
            shutdown,
        }
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Connect to the camera and start relaying.
    ///
    /// Fails without spawning anything when the camera is unreachable or
    /// answers with a non-success status; the upstream body is never read
    /// in that case.
    pub async fn open(&self) -> Result<RelayBody, CoreError> {
        let upstream = self.camera.open(None).await.map_err(|e| {
            warn!(url = %self.camera.stream_url(), error = %e, "camera stream unavailable");
            CoreError::from(e)
        })?;

        debug!(content_type = ?upstream.content_type(), "camera stream opened");
        let (body, _task) = spawn_relay(
            upstream.into_stream(),
            Arc::clone(&self.stats),
            self.shutdown.child_token(),
        );
        Ok(body)
    }
}

// ── Relay task ───────────────────────────────────────────────────────

/// Spawn a relay task pumping `upstream` into a fresh body stream.
///
/// The returned handle resolves to the [`RelayOutcome`]; callers that only
/// serve the body may drop it.
pub fn spawn_relay<S, E>(
    upstream: S,
    stats: Arc<RelayStats>,
    cancel: CancellationToken,
) -> (RelayBody, JoinHandle<RelayOutcome>)
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    let guard = stats.enter();

    let task = tokio::spawn(async move {
        let outcome = pump(upstream, tx, &guard.0, &cancel).await;
        match &outcome {
            RelayOutcome::Completed { chunks, bytes } => {
                info!(chunks, bytes, "relay finished: upstream ended");
            }
            RelayOutcome::UpstreamFailed {
                chunks,
                bytes,
                reason,
            } => {
                warn!(chunks, bytes, error = %reason, "relay aborted: upstream failed");
            }
            RelayOutcome::ClientGone { chunks, bytes } => {
                info!(chunks, bytes, "relay stopped: client disconnected");
            }
            RelayOutcome::Cancelled { chunks, bytes } => {
                debug!(chunks, bytes, "relay stopped: shutdown");
            }
        }
        drop(guard);
        outcome
    });

    (ReceiverStream::new(rx), task)
}

/// Copy chunks until the upstream ends, fails, or nobody is listening.
///
/// Takes `upstream` and `sink` by value: both are dropped on return.
/// Cancellation is observed while waiting on either side, including a
/// send parked on a full buffer behind a client that stopped reading.
async fn pump<S, E>(
    mut upstream: S,
    sink: mpsc::Sender<Result<Bytes, io::Error>>,
    stats: &RelayStats,
    cancel: &CancellationToken,
) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut chunks: u64 = 0;
    let mut bytes: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return RelayOutcome::Cancelled { chunks, bytes },
            () = sink.closed() => return RelayOutcome::ClientGone { chunks, bytes },
            next = upstream.next() => next,
        };

        match next {
            None => return RelayOutcome::Completed { chunks, bytes },
            Some(Ok(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                let len = chunk.len() as u64;
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return RelayOutcome::Cancelled { chunks, bytes },
                    sent = sink.send(Ok(chunk)) => {
                        if sent.is_err() {
                            return RelayOutcome::ClientGone { chunks, bytes };
                        }
                    }
                }
                chunks += 1;
                bytes += len;
                stats.bytes.fetch_add(len, Ordering::Relaxed);
            }
            Some(Err(e)) => {
                let reason = e.to_string();
                // Best effort: the client may already be gone or stalled.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {}
                    _ = sink.send(Err(io::Error::other(reason.clone()))) => {}
                }
                return RelayOutcome::UpstreamFailed {
                    chunks,
                    bytes,
                    reason,
                };
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
