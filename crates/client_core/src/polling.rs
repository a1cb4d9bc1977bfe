//! Interval timer for pages that refresh themselves.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns a background timer task. Ticks are delivered through [`tick`](Self::tick);
/// the task is aborted on [`cancel`](Self::cancel) or drop.
pub struct PollingSubscription {
    interval: Duration,
    ticks: mpsc::Receiver<Instant>,
    task: Option<JoinHandle<()>>,
    // The timer task holds a clone for as long as it runs.
    alive: Arc<()>,
}

impl PollingSubscription {
    /// The first tick fires one full interval after start. A consumer that
    /// falls behind sees a single pending tick, not a burst.
    pub fn start(interval: Duration) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, ticks) = mpsc::channel(1);
        let alive = Arc::new(());
        let task_alive = Arc::clone(&alive);

        let task = tokio::spawn(async move {
            let _alive = task_alive;
            let mut timer = time::interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = IntervalStream::new(timer);
            while let Some(at) = ticks.next().await {
                match tx.try_send(at) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });
        debug!(interval_ms = interval.as_millis() as u64, "polling started");

        Self {
            interval,
            ticks,
            task: Some(task),
            alive,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some() && Arc::strong_count(&self.alive) > 1
    }

    /// Wait for the next tick. Returns `None` once the subscription is cancelled.
    pub async fn tick(&mut self) -> Option<Instant> {
        if self.task.is_none() {
            return None;
        }
        self.ticks.recv().await
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.ticks.close();
            debug!(interval_ms = self.interval.as_millis() as u64, "polling cancelled");
        }
    }
}

impl Drop for PollingSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
