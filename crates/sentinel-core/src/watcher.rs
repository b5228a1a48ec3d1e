//! Headless stream viewer.
//!
//! [`StreamWatcher`] plays the part of a browser `<img>` pointed at the
//! relay: it opens the stream, drains it, and lets a [`Reconnector`]
//! decide when to try again. Each attempt runs in its own task and
//! reports back over a channel tagged with its [`Attempt`], so events from
//! a superseded attempt are discarded by the state machine.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sentinel_api::CameraClient;

use crate::reconnect::{
    Attempt, CONNECT_FAILED, ReconnectStatus, Reconnector, RetryScheduler, STREAM_LOST,
};
use crate::scheduler::TokioScheduler;

#[derive(Debug)]
enum AttemptEvent {
    Loaded(Attempt),
    Failed(Attempt, String),
}

/// Control handle for a running [`StreamWatcher`].
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    status: watch::Receiver<ReconnectStatus>,
    reconnect: mpsc::Sender<()>,
    cancel: CancellationToken,
}

impl WatcherHandle {
    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<ReconnectStatus> {
        self.status.clone()
    }

    /// Ask for an immediate reconnect. Requests made while one is already
    /// queued are merged.
    pub fn reconnect(&self) {
        let _ = self.reconnect.try_send(());
    }

    /// Stop the watcher.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Drives one [`Reconnector`] against a live camera stream.
pub struct StreamWatcher {
    camera: CameraClient,
    retry_delay: Duration,
    status: watch::Sender<ReconnectStatus>,
    reconnect: mpsc::Receiver<()>,
    cancel: CancellationToken,
}

impl StreamWatcher {
    pub fn new(
        camera: CameraClient,
        retry_delay: Duration,
        cancel: CancellationToken,
    ) -> (Self, WatcherHandle) {
        let (status_tx, status_rx) = watch::channel(ReconnectStatus::default());
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);

        let watcher = Self {
            camera,
            retry_delay,
            status: status_tx,
            reconnect: reconnect_rx,
            cancel: cancel.clone(),
        };
        let handle = WatcherHandle {
            status: status_rx,
            reconnect: reconnect_tx,
            cancel,
        };
        (watcher, handle)
    }

    /// Run until cancelled. Returns the final status.
    pub async fn run(mut self) -> ReconnectStatus {
        let (scheduler, mut fired) = TokioScheduler::channel();
        let mut machine = Reconnector::new(scheduler, self.retry_delay);
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut current: Option<JoinHandle<()>> = None;

        if let Some(attempt) = machine.start() {
            current = Some(self.spawn_attempt(attempt, events_tx.clone()));
        }
        self.publish(&machine);

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(()) = self.reconnect.recv() => machine.manual_reconnect(),
                Some(id) = fired.recv() => machine.on_retry_fired(id),
                Some(event) = events.recv() => {
                    match event {
                        AttemptEvent::Loaded(attempt) => machine.on_load(attempt),
                        AttemptEvent::Failed(attempt, reason) => {
                            machine.on_error(attempt, reason);
                        }
                    }
                    None
                }
            };

            if let Some(attempt) = next {
                if let Some(previous) = current.take() {
                    previous.abort();
                }
                current = Some(self.spawn_attempt(attempt, events_tx.clone()));
            }
            self.publish(&machine);
        }

        if let Some(task) = current.take() {
            task.abort();
        }
        machine.dispose();
        self.publish(&machine);
        debug!("watcher stopped");
        machine.status()
    }

    fn publish<S: RetryScheduler>(&self, machine: &Reconnector<S>) {
        let status = machine.status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn spawn_attempt(
        &self,
        attempt: Attempt,
        events: mpsc::UnboundedSender<AttemptEvent>,
    ) -> JoinHandle<()> {
        let camera = self.camera.clone();
        tokio::spawn(async move {
            let reason = drive_attempt(&camera, attempt, &events).await;
            let _ = events.send(AttemptEvent::Failed(attempt, reason));
        })
    }
}

/// Open and drain one attempt. Returns the failure reason once it ends.
async fn drive_attempt(
    camera: &CameraClient,
    attempt: Attempt,
    events: &mpsc::UnboundedSender<AttemptEvent>,
) -> String {
    let mut stream = match camera.open(Some(attempt.reload_token)).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(reload_token = attempt.reload_token, error = %e, "camera stream unavailable");
            return format!("{CONNECT_FAILED}: {e}");
        }
    };

    let mut loaded = false;
    let mut bytes: u64 = 0;
    loop {
        match stream.next_chunk().await {
            Ok(Some(chunk)) if chunk.is_empty() => {}
            Ok(Some(chunk)) => {
                bytes += chunk.len() as u64;
                if !loaded {
                    loaded = true;
                    let _ = events.send(AttemptEvent::Loaded(attempt));
                }
            }
            Ok(None) => {
                debug!(bytes, "camera stream ended");
                break;
            }
            Err(e) => {
                debug!(bytes, error = %e, "camera stream read failed");
                break;
            }
        }
    }
    STREAM_LOST.to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use sentinel_api::TransportConfig;

    use super::*;
    use crate::reconnect::LinkState;

    const WAIT: Duration = Duration::from_secs(5);

    /// Minimal camera: the first `failures` connections get a 503, later
    /// ones get one frame and are then held open.
    async fn fake_camera(failures: usize) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&connections);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = seen.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0_u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    if n < failures {
                        let _ = socket
                            .write_all(
                                b"HTTP/1.1 503 Service Unavailable\r\n\
                                  Content-Length: 0\r\nConnection: close\r\n\r\n",
                            )
                            .await;
                        return;
                    }
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\n\
                              Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\r\n\
                              --frame\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8\xFF\xD9\r\n",
                        )
                        .await;
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                });
            }
        });

        (format!("http://{addr}/stream"), connections)
    }

    /// Camera that accepts connections and never answers.
    async fn silent_camera() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}/stream")
    }

    fn watcher(url: &str, retry: Duration) -> (StreamWatcher, WatcherHandle) {
        let camera =
            CameraClient::new(url, &TransportConfig::streaming(Duration::from_secs(2))).unwrap();
        StreamWatcher::new(camera, retry, CancellationToken::new())
    }

    async fn wait_for(
        rx: &mut watch::Receiver<ReconnectStatus>,
        f: impl FnMut(&ReconnectStatus) -> bool,
    ) -> ReconnectStatus {
        tokio::time::timeout(WAIT, rx.wait_for(f))
            .await
            .unwrap()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn connects_to_live_stream() {
        let (url, _) = fake_camera(0).await;
        let (w, handle) = watcher(&url, Duration::from_secs(60));
        let task = tokio::spawn(w.run());

        let mut rx = handle.status();
        let status = wait_for(&mut rx, |s| s.state == LinkState::Connected).await;
        assert_eq!(status.reload_token, 0);
        assert!(status.last_error.is_none());

        handle.shutdown();
        let last = task.await.unwrap();
        assert!(!last.retry_pending);
    }

    #[tokio::test]
    async fn unavailable_camera_disconnects_then_retries() {
        let (url, connections) = fake_camera(1).await;
        let (w, handle) = watcher(&url, Duration::from_millis(100));
        let task = tokio::spawn(w.run());

        let mut rx = handle.status();
        let status = wait_for(&mut rx, |s| s.state == LinkState::Connected).await;

        assert_eq!(status.reload_token, 1);
        assert_eq!(connections.load(Ordering::SeqCst), 2);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failed_open_records_reason_and_arms_retry() {
        let (url, _) = fake_camera(usize::MAX).await;
        let (w, handle) = watcher(&url, Duration::from_secs(60));
        let task = tokio::spawn(w.run());

        let mut rx = handle.status();
        let status = wait_for(&mut rx, |s| s.state == LinkState::Disconnected).await;

        assert!(status.retry_pending);
        assert!(
            status
                .last_error
                .as_deref()
                .is_some_and(|e| e.starts_with(CONNECT_FAILED)),
            "got {status:?}"
        );

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn manual_reconnect_skips_the_wait() {
        let (url, connections) = fake_camera(1).await;
        let (w, handle) = watcher(&url, Duration::from_secs(3600));
        let task = tokio::spawn(w.run());

        let mut rx = handle.status();
        wait_for(&mut rx, |s| s.state == LinkState::Disconnected).await;
        handle.reconnect();
        let status = wait_for(&mut rx, |s| s.state == LinkState::Connected).await;

        assert_eq!(status.reload_token, 1);
        assert!(!status.retry_pending);
        assert_eq!(connections.load(Ordering::SeqCst), 2);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn silent_camera_times_out_and_arms_retry() {
        let url = silent_camera().await;
        let transport = TransportConfig::streaming(Duration::from_secs(2))
            .with_response_timeout(Duration::from_millis(200));
        let camera = CameraClient::new(&url, &transport).unwrap();
        let (w, handle) =
            StreamWatcher::new(camera, Duration::from_secs(60), CancellationToken::new());
        let task = tokio::spawn(w.run());

        let mut rx = handle.status();
        let status = wait_for(&mut rx, |s| s.state == LinkState::Disconnected).await;

        assert!(status.retry_pending);
        assert!(
            status
                .last_error
                .as_deref()
                .is_some_and(|e| e.starts_with(CONNECT_FAILED)),
            "got {status:?}"
        );

        handle.shutdown();
        task.await.unwrap();
    }
}
