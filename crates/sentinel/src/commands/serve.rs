//! `sentinel serve`: run the relay and record API until Ctrl-C.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sentinel::AppState;
use sentinel_core::{RecordService, StreamRelay};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::config;
use crate::error::CliError;

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    config::apply_serve_args(&mut cfg, &args);

    let addr = cfg.server.bind_addr()?;
    let camera = cfg.camera.client()?;

    let records = if cfg.store.is_configured() {
        Some(RecordService::new(cfg.store.client()?))
    } else {
        warn!("no record store configured; record routes will answer 503");
        None
    };

    let shutdown = CancellationToken::new();
    let relay = StreamRelay::new(camera, shutdown.clone());
    let state = Arc::new(AppState::new(relay, records, &cfg.camera.boundary));

    let listener = TcpListener::bind(addr).await?;
    info!(camera = %cfg.camera.stream_url, "relaying camera stream");
    if !global.quiet {
        eprintln!("Relay listening on http://{}/proxy-stream", listener.local_addr()?);
    }

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, shutting down");
        }
        signal.cancel();
    });

    sentinel::serve(listener, state, shutdown).await?;
    Ok(())
}
