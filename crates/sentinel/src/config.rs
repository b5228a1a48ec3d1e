//! CLI configuration: thin wrapper around `sentinel_config`.
//!
//! Resolves which file to read (`--config` beats the platform default) and
//! applies per-command flag overrides on top of the loaded values.

use std::path::PathBuf;
use std::time::Duration;

use sentinel_core::RecordService;

use crate::cli::{GlobalOpts, ServeArgs, WatchArgs};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sentinel_config::{Config, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// The config file this invocation reads and writes.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(sentinel_config::config_path)
}

/// Load config from file + environment.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(sentinel_config::load_config_from(&config_file(global))?)
}

/// Flag overrides for `serve`. Flags win over file and env values.
pub fn apply_serve_args(cfg: &mut Config, args: &ServeArgs) {
    if let Some(ref bind) = args.bind {
        cfg.server.bind.clone_from(bind);
    }
    if let Some(ref url) = args.camera_url {
        cfg.camera.stream_url.clone_from(url);
    }
    if let Some(ref boundary) = args.boundary {
        cfg.camera.boundary.clone_from(boundary);
    }
    if args.no_store {
        cfg.store.url = None;
    }
}

/// Flag overrides for `watch`. Returns the retry delay to use.
pub fn apply_watch_args(cfg: &mut Config, args: &WatchArgs) -> Duration {
    if let Some(ref url) = args.url {
        cfg.watch.url.clone_from(url);
    }
    args.retry_delay.unwrap_or_else(|| cfg.watch.retry_delay())
}

/// Record service for the configured store.
pub fn record_service(global: &GlobalOpts) -> Result<RecordService, CliError> {
    let cfg = load(global)?;
    Ok(RecordService::new(cfg.store.client()?))
}
