//! Request lifecycle shared by every dashboard page.
//!
//! A [`FetchController`] owns one logical request slot. Each call to
//! [`FetchController::trigger`] starts a new generation; only the completion
//! tagged with the current generation may touch the state, so a slow response
//! for an old ticker can never overwrite the answer for the new one.
//!
//! Work runs on spawned tokio tasks and reports back over a channel owned by
//! the controller. The page that owns the controller is the single writer: it
//! applies completions with [`FetchController::pump`] or awaits them with
//! [`FetchController::changed`].

use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::error::FetchError;

pub type RequestFuture<T> = BoxFuture<'static, Result<T, FetchError>>;
type RequestFn<K, T> = Arc<dyn Fn(K) -> RequestFuture<T> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub status: RequestStatus,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Bumped on every successful load.
    pub version: u64,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            status: RequestStatus::Idle,
            data: None,
            error: None,
            version: 0,
        }
    }
}

impl<T> RequestState<T> {
    pub fn is_idle(&self) -> bool {
        self.status == RequestStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == RequestStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == RequestStatus::Error
    }
}

struct Completion<T> {
    generation: u64,
    result: Result<T, FetchError>,
}

pub struct FetchController<K, T> {
    label: &'static str,
    request: RequestFn<K, T>,
    state: RequestState<T>,
    failure: Option<FetchError>,
    generation: u64,
    last_key: Option<K>,
    in_flight: Option<JoinHandle<()>>,
    completions_tx: mpsc::UnboundedSender<Completion<T>>,
    completions_rx: mpsc::UnboundedReceiver<Completion<T>>,
    retain_data: bool,
}

impl<K, T> FetchController<K, T>
where
    K: Clone + Send + 'static,
    T: Send + 'static,
{
    pub fn new<F, Fut>(label: &'static str, request: F) -> Self
    where
        F: Fn(K) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            label,
            request: Arc::new(move |key| request(key).boxed()),
            state: RequestState::default(),
            failure: None,
            generation: 0,
            last_key: None,
            in_flight: None,
            completions_tx,
            completions_rx,
            retain_data: false,
        }
    }

    /// Keep the previous data visible while a refresh is loading and after a
    /// failed refresh. Used by polled views so the screen does not blank on
    /// every tick.
    pub fn retain_data_while_loading(mut self) -> Self {
        self.retain_data = true;
        self
    }

    /// Start a request for `key`, superseding anything in flight.
    pub fn trigger(&mut self, key: K) -> u64 {
        let generation = self.advance_generation();
        self.state.status = RequestStatus::Loading;
        self.state.error = None;
        self.failure = None;
        if !self.retain_data {
            self.state.data = None;
        }
        self.last_key = Some(key.clone());

        let request = (self.request)(key);
        let completions = self.completions_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = match AssertUnwindSafe(request).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(FetchError::Internal(panic_message(payload))),
            };
            let _ = completions.send(Completion { generation, result });
        }));
        debug!(controller = self.label, generation, "request queued");
        generation
    }

    /// Re-issue the last triggered request. Returns `None` when nothing has
    /// been requested yet.
    pub fn retry(&mut self) -> Option<u64> {
        let key = self.last_key.clone()?;
        Some(self.trigger(key))
    }

    /// Record a client-side validation failure without touching the network.
    pub fn reject(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.advance_generation();
        debug!(controller = self.label, %message, "request rejected before sending");
        self.state.status = RequestStatus::Error;
        self.state.error = Some(message.clone());
        if !self.retain_data {
            self.state.data = None;
        }
        self.failure = Some(FetchError::Validation(message));
    }

    /// Abandon the in-flight request, keeping whatever data is already loaded.
    pub fn cancel(&mut self) {
        self.advance_generation();
        if self.state.is_loading() {
            self.state.status = if self.state.data.is_some() {
                RequestStatus::Success
            } else {
                RequestStatus::Idle
            };
        }
    }

    pub fn reset(&mut self) {
        self.advance_generation();
        self.state = RequestState {
            version: self.state.version,
            ..RequestState::default()
        };
        self.failure = None;
        self.last_key = None;
    }

    /// Apply every completion that has already arrived. Returns true when the
    /// visible state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.completions_rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Wait for the next completion belonging to the current generation.
    ///
    /// Cancel safe: dropping the future before it resolves loses nothing, so
    /// it can sit in a `tokio::select!` next to timers and input. Pends
    /// forever when nothing is in flight.
    pub async fn changed(&mut self) {
        while let Some(completion) = self.completions_rx.recv().await {
            if self.apply(completion) {
                return;
            }
        }
    }

    /// Wait until the current request, if any, has finished.
    pub async fn settled(&mut self) {
        self.pump();
        while self.state.is_loading() {
            self.changed().await;
        }
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    pub fn data(&self) -> Option<&T> {
        self.state.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn failure(&self) -> Option<&FetchError> {
        self.failure.as_ref()
    }

    pub fn last_key(&self) -> Option<&K> {
        self.last_key.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn advance_generation(&mut self) -> u64 {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
        self.generation += 1;
        self.generation
    }

    fn apply(&mut self, completion: Completion<T>) -> bool {
        if completion.generation != self.generation {
            debug!(
                controller = self.label,
                stale = completion.generation,
                current = self.generation,
                "discarding stale response"
            );
            return false;
        }
        self.in_flight = None;
        match completion.result {
            Ok(data) => {
                self.state.status = RequestStatus::Success;
                self.state.data = Some(data);
                self.state.error = None;
                self.state.version += 1;
                self.failure = None;
            }
            Err(err) => {
                warn!(controller = self.label, error = %err, "request failed");
                self.state.status = RequestStatus::Error;
                self.state.error = Some(err.user_message());
                if !self.retain_data {
                    self.state.data = None;
                }
                self.failure = Some(err);
            }
        }
        true
    }
}

impl<K, T> Drop for FetchController<K, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "request panicked".to_string()
    }
}

/// A view computed from a controller's data, recomputed only when a new
/// successful load lands.
#[derive(Debug)]
pub struct Derived<V> {
    version: Option<u64>,
    value: Option<V>,
    computations: u64,
}

impl<V> Default for Derived<V> {
    fn default() -> Self {
        Self {
            version: None,
            value: None,
            computations: 0,
        }
    }
}

impl<V> Derived<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the cached value changed.
    pub fn refresh<T>(&mut self, state: &RequestState<T>, compute: impl FnOnce(&T) -> V) -> bool {
        let Some(data) = state.data.as_ref() else {
            self.version = None;
            return self.value.take().is_some();
        };
        if self.version == Some(state.version) {
            return false;
        }
        self.value = Some(compute(data));
        self.version = Some(state.version);
        self.computations += 1;
        true
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn computations(&self) -> u64 {
        self.computations
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
