//! Domain layer between `sentinel-api` and the server / CLI.
//!
//! - **[`StreamRelay`]**: one bounded-lifetime task per viewer that copies
//!   the camera's MJPEG bytes into an HTTP body, in order, and always
//!   releases the upstream connection when it ends.
//!
//! - **[`Reconnector`]**: the viewer-side reconnect state machine. Timers
//!   are injected through [`RetryScheduler`]; [`TokioScheduler`] is the
//!   runtime implementation.
//!
//! - **[`StreamWatcher`]**: a headless viewer that drives a `Reconnector`
//!   against a live stream and publishes its status over a `watch` channel.
//!
//! - **[`RecordService`]**: soldiers, system logs and threats in the
//!   PostgREST store, with input validation and domain errors.

pub mod error;
pub mod reconnect;
pub mod records;
pub mod relay;
pub mod scheduler;
pub mod watcher;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use reconnect::{
    Attempt, DEFAULT_RETRY_DELAY, LinkState, ReconnectStatus, Reconnector, RetryScheduler,
    TimerId,
};
pub use records::RecordService;
pub use relay::{RelayBody, RelayOutcome, RelayStats, RelayStatsSnapshot, StreamRelay};
pub use scheduler::TokioScheduler;
pub use watcher::{StreamWatcher, WatcherHandle};

// Record types pass straight through from the store client.
pub use sentinel_api::store::{
    NewSystemLog, NewThreat, RecordId, Soldier, SoldierFields, SystemLog, Threat,
};
