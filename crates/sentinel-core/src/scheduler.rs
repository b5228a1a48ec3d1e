//! Tokio-backed [`RetryScheduler`].
//!
//! Each scheduled retry is a small sleeping task that sends its
//! [`TimerId`] over a channel when it wakes. The owner of the receiving
//! end feeds those ids back into [`Reconnector::on_retry_fired`].
//!
//! [`Reconnector::on_retry_fired`]: crate::reconnect::Reconnector::on_retry_fired

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::reconnect::{RetryScheduler, TimerId};

/// Schedules retries as tokio sleep tasks.
///
/// All timers still pending are aborted when the scheduler is dropped.
#[derive(Debug)]
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerId>,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(fired: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            fired,
            timers: HashMap::new(),
        }
    }

    /// Scheduler plus the receiver its timers fire into.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TimerId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl RetryScheduler for TokioScheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.timers.retain(|_, handle| !handle.is_finished());

        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the owner is shutting down.
            let _ = fired.send(id);
        });
        if let Some(previous) = self.timers.insert(id, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reconnect::{CONNECT_FAILED, DEFAULT_RETRY_DELAY, LinkState, Reconnector};

    #[tokio::test(start_paused = true)]
    async fn retry_fires_after_five_seconds() {
        let (scheduler, mut fired) = TokioScheduler::channel();
        let mut r = Reconnector::new(scheduler, DEFAULT_RETRY_DELAY);
        let attempt = r.start().unwrap();
        r.on_error(attempt, CONNECT_FAILED);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(fired.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let id = fired.try_recv().unwrap();
        let next = r.on_retry_fired(id).unwrap();

        assert_eq!(next.reload_token, 1);
        assert_eq!(r.state(), LinkState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (scheduler, mut fired) = TokioScheduler::channel();
        let mut r = Reconnector::new(scheduler, DEFAULT_RETRY_DELAY);
        let attempt = r.start().unwrap();
        r.on_error(attempt, CONNECT_FAILED);
        r.manual_reconnect().unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(fired.try_recv().is_err());
        assert_eq!(r.scheduler().pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scheduler_aborts_timers() {
        let (mut scheduler, mut fired) = TokioScheduler::channel();
        scheduler.schedule(TimerId::default(), Duration::from_secs(1));
        drop(scheduler);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(fired.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_one_second_apart_fire_once() {
        let (scheduler, mut fired) = TokioScheduler::channel();
        let mut r = Reconnector::new(scheduler, DEFAULT_RETRY_DELAY);
        let attempt = r.start().unwrap();

        assert!(r.on_error(attempt, CONNECT_FAILED));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!r.on_error(attempt, CONNECT_FAILED));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(fired.try_recv().is_ok());
        assert!(fired.try_recv().is_err());
    }
}
