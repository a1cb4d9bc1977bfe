//! Trailing-edge debounce for keystroke-driven lookups.

use std::time::Duration;

use tokio::time::{self, Instant};

pub const AUTOCOMPLETE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolve with the latest value once no push has happened for the full
    /// delay. Cancel safe; pends forever while nothing is pending.
    pub async fn settled(&mut self) -> T {
        loop {
            match self.pending.as_ref() {
                Some((_, deadline)) => time::sleep_until(*deadline).await,
                None => std::future::pending::<()>().await,
            }
            if let Some((value, deadline)) = self.pending.take() {
                if deadline <= Instant::now() {
                    return value;
                }
                self.pending = Some((value, deadline));
            }
        }
    }
}
