//! Viewer-side reconnect state machine.
//!
//! A [`Reconnector`] tracks one viewer's link to the relay and decides when
//! to try again. It never sleeps itself: timers go through an injected
//! [`RetryScheduler`], and every callback is a plain `&mut self` method, so
//! the whole machine can be driven step by step in tests.
//!
//! ```text
//!            start / retry fired / manual
//!   Disconnected ─────────────────────────▶ Connecting
//!        ▲                                    │    │
//!        │  stream error (arms ≤1 retry)      │    │ first frame
//!        └────────────────────────────────────┘    ▼
//!        └──────────────────────────────────── Connected
//! ```
//!
//! Every failure is treated the same way: one retry after a fixed delay,
//! unless a retry is already pending. There is no attempt limit and no
//! backoff growth.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

/// Delay before an automatic retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Prefix of the failure reason recorded when an attempt could not be opened.
pub const CONNECT_FAILED: &str = "Cannot connect to camera stream";

/// Failure reason recorded when an established stream dropped.
pub const STREAM_LOST: &str = "Stream lost. Reconnecting...";

// ── LinkState ────────────────────────────────────────────────────────

/// Link state as a viewer would display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

// ── Scheduling seam ──────────────────────────────────────────────────

/// Identifies one scheduled retry.
///
/// Ids are never reused within a [`Reconnector`], so a fire that races a
/// cancel can be recognised as stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Something that can fire a retry later.
///
/// Implementations report a fire by having their owner call
/// [`Reconnector::on_retry_fired`] with the same id.
pub trait RetryScheduler {
    /// Arrange for `id` to fire after `delay`.
    fn schedule(&mut self, id: TimerId, delay: Duration);

    /// Forget `id`. Cancelling an id that already fired is a no-op.
    fn cancel(&mut self, id: TimerId);
}

// ── Attempt ──────────────────────────────────────────────────────────

/// One connection attempt.
///
/// `reload_token` doubles as the cache-busting query value; load and error
/// callbacks carry the attempt back so late callbacks from a superseded
/// attempt are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub reload_token: u64,
}

/// Snapshot of a reconnector for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconnectStatus {
    pub state: LinkState,
    pub last_error: Option<String>,
    pub reload_token: u64,
    pub retry_pending: bool,
}

impl Default for ReconnectStatus {
    fn default() -> Self {
        Self {
            state: LinkState::Connecting,
            last_error: None,
            reload_token: 0,
            retry_pending: false,
        }
    }
}

// ── Reconnector ──────────────────────────────────────────────────────

/// Reconnect state machine for a single viewer.
///
/// Owns its pending-retry slot; two viewers never share a timer.
#[derive(Debug)]
pub struct Reconnector<S> {
    scheduler: S,
    retry_delay: Duration,
    state: LinkState,
    pending: Option<TimerId>,
    next_timer: u64,
    reload_token: u64,
    last_error: Option<String>,
    started: bool,
    disposed: bool,
}

impl<S: RetryScheduler> Reconnector<S> {
    pub fn new(scheduler: S, retry_delay: Duration) -> Self {
        Self {
            scheduler,
            retry_delay,
            state: LinkState::Connecting,
            pending: None,
            next_timer: 0,
            reload_token: 0,
            last_error: None,
            started: false,
            disposed: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn reload_token(&self) -> u64 {
        self.reload_token
    }

    /// The retry currently scheduled, if any.
    pub fn pending_retry(&self) -> Option<TimerId> {
        self.pending
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn status(&self) -> ReconnectStatus {
        ReconnectStatus {
            state: self.state,
            last_error: self.last_error.clone(),
            reload_token: self.reload_token,
            retry_pending: self.pending.is_some(),
        }
    }

    fn current(&self) -> Attempt {
        Attempt {
            reload_token: self.reload_token,
        }
    }

    fn is_live(&self, attempt: Attempt) -> bool {
        !self.disposed && attempt.reload_token == self.reload_token
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Issue the first probe. Only the first call returns an attempt.
    pub fn start(&mut self) -> Option<Attempt> {
        if self.disposed || self.started {
            return None;
        }
        self.started = true;
        self.state = LinkState::Connecting;
        debug!(reload_token = self.reload_token, "initial probe");
        Some(self.current())
    }

    /// The attempt delivered its first frame.
    pub fn on_load(&mut self, attempt: Attempt) {
        if !self.is_live(attempt) {
            return;
        }
        self.cancel_pending();
        self.last_error = None;
        if self.state != LinkState::Connected {
            info!(reload_token = self.reload_token, "stream connected");
        }
        self.state = LinkState::Connected;
    }

    /// The attempt failed to open, or its stream broke.
    ///
    /// Returns `true` if this call armed the retry timer.
    pub fn on_error(&mut self, attempt: Attempt, reason: impl Into<String>) -> bool {
        if !self.is_live(attempt) {
            return false;
        }
        let reason = reason.into();
        info!(reload_token = self.reload_token, %reason, "stream disconnected");
        self.state = LinkState::Disconnected;
        self.last_error = Some(reason);

        if self.pending.is_some() {
            return false;
        }
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.scheduler.schedule(id, self.retry_delay);
        self.pending = Some(id);
        debug!(timer = id.0, delay_ms = self.retry_delay.as_millis(), "retry armed");
        true
    }

    /// A scheduled retry fired. Stale or unknown ids are ignored.
    pub fn on_retry_fired(&mut self, id: TimerId) -> Option<Attempt> {
        if self.disposed || self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        Some(self.begin_attempt())
    }

    /// Drop any pending retry and try again right now.
    pub fn manual_reconnect(&mut self) -> Option<Attempt> {
        if self.disposed {
            return None;
        }
        self.cancel_pending();
        self.last_error = None;
        info!("manual reconnect");
        Some(self.begin_attempt())
    }

    /// Tear down: cancel the pending retry and ignore all later callbacks.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_pending();
        self.disposed = true;
    }

    fn begin_attempt(&mut self) -> Attempt {
        self.reload_token += 1;
        self.state = LinkState::Connecting;
        debug!(reload_token = self.reload_token, "new attempt");
        self.current()
    }

    fn cancel_pending(&mut self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
            debug!(timer = id.0, "retry cancelled");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
