//! `sentinel watch`: a headless viewer with automatic reconnect.
//!
//! Prints every link-state change. Pressing Enter reconnects immediately;
//! Ctrl-C stops.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sentinel_api::CameraClient;
use sentinel_core::{ReconnectStatus, StreamWatcher};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    let retry_delay = config::apply_watch_args(&mut cfg, &args);

    let camera = CameraClient::new(&cfg.watch.url, &cfg.camera.transport()).map_err(|e| {
        CliError::Validation {
            field: "watch.url".into(),
            reason: e.to_string(),
        }
    })?;

    let (watcher, handle) = StreamWatcher::new(camera, retry_delay, CancellationToken::new());
    let mut status = handle.status();
    let run = tokio::spawn(watcher.run());

    if !global.quiet {
        eprintln!(
            "Watching {} (retry every {}s). Press Enter to reconnect, Ctrl-C to stop.",
            cfg.watch.url,
            retry_delay.as_secs_f64()
        );
    }

    let manual = handle.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            debug!("manual reconnect requested");
            manual.reconnect();
        }
    });

    let color = output::should_color(&global.color);
    print_status(&status.borrow_and_update(), &global.output, color, global.quiet);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                print_status(&current, &global.output, color, global.quiet);
            }
            _ = tokio::signal::ctrl_c() => {
                handle.shutdown();
                break;
            }
        }
    }

    let last = run
        .await
        .map_err(|e| CliError::Internal(format!("watcher task failed: {e}")))?;
    debug!(reload_token = last.reload_token, "watch finished");
    Ok(())
}

fn print_status(status: &ReconnectStatus, format: &OutputFormat, color: bool, quiet: bool) {
    let line = output::render_single(
        format,
        status,
        |s| {
            let state = output::link_state(s.state, color);
            let now = chrono::Local::now().format("%H:%M:%S");
            match s.last_error {
                Some(ref err) if s.retry_pending => {
                    format!("[{now}] {state} (attempt {}): {err}, retry scheduled", s.reload_token)
                }
                Some(ref err) => format!("[{now}] {state} (attempt {}): {err}", s.reload_token),
                None => format!("[{now}] {state} (attempt {})", s.reload_token),
            }
        },
        |s| s.state.to_string(),
    );
    output::print_output(&line, quiet);
}
