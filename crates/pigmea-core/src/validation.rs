// ── Debounced uniqueness checks ──
//
// `AsyncValidationGuard` wraps any asynchronous existence check with a
// restartable delay and a generation counter. Every input change issues a
// new generation; a response is applied only if its generation is still
// the latest when it arrives. Stale responses are discarded, not aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::EntityBackend;
use crate::error::CoreError;
use crate::model::Entity;

/// Observable state of one guarded field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationState {
    /// Nothing to check (empty or too-short input).
    #[default]
    Idle,
    /// Waiting for the delay or for the check to answer.
    Pending,
    /// No other record uses the value.
    Available,
    /// The value is already taken.
    Conflict,
    /// The check itself failed; says nothing about availability.
    Failed(String),
}

impl ValidationState {
    /// Whether the guard has reached an answer for the current input.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Quiet period after the last input change before checking.
    pub delay: Duration,
    /// Trimmed inputs shorter than this (in characters) are not checked.
    pub min_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            min_length: 3,
        }
    }
}

/// The asynchronous question the guard debounces.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn exists(&self, value: &str) -> Result<bool, CoreError>;
}

/// Checks `K`'s unique field through its backend.
pub struct UniqueFieldCheck<K: Entity> {
    backend: Arc<dyn EntityBackend<K>>,
}

impl<K: Entity> UniqueFieldCheck<K> {
    pub fn new(backend: Arc<dyn EntityBackend<K>>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl<K: Entity> ExistenceCheck for UniqueFieldCheck<K> {
    async fn exists(&self, value: &str) -> Result<bool, CoreError> {
        self.backend
            .exists_by_unique_field(K::unique_field(), value)
            .await
    }
}

// ── AsyncValidationGuard ─────────────────────────────────────────────

/// Debounce + ignore-stale wrapper around an [`ExistenceCheck`].
///
/// `input` must be called from within a tokio runtime.
pub struct AsyncValidationGuard {
    check: Arc<dyn ExistenceCheck>,
    config: ValidationConfig,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<ValidationState>>,
    timer: Mutex<Option<CancellationToken>>,
}

impl AsyncValidationGuard {
    pub fn new(check: Arc<dyn ExistenceCheck>, config: ValidationConfig) -> Self {
        let (state, _) = watch::channel(ValidationState::Idle);
        Self {
            check,
            config,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            timer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn state(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.state.subscribe()
    }

    /// Feed a new input value, superseding any pending check.
    pub fn input(&self, raw: &str) {
        let value = raw.trim().to_owned();
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timer = self.restart_timer();

        if value.chars().count() < self.config.min_length {
            timer.cancel();
            self.state.send_replace(ValidationState::Idle);
            return;
        }

        self.state.send_replace(ValidationState::Pending);

        let check = Arc::clone(&self.check);
        let generation = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let delay = self.config.delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = timer.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            let next = match check.exists(&value).await {
                Ok(true) => ValidationState::Conflict,
                Ok(false) => ValidationState::Available,
                Err(e) => ValidationState::Failed(e.to_string()),
            };

            // Compared under the channel lock so a concurrent `input` either
            // sees our answer overwritten by `Pending` or makes us drop it.
            let applied = state.send_if_modified(|current| {
                if generation.load(Ordering::SeqCst) == token {
                    *current = next;
                    true
                } else {
                    false
                }
            });
            if !applied {
                debug!(value = %value, "discarding stale validation result");
            }
        });
    }

    /// Wait until the current input has an answer.
    pub async fn settled(&self) -> ValidationState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(ValidationState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Drop any pending check and return to `Idle`.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = self.take_timer() {
            timer.cancel();
        }
        self.state.send_replace(ValidationState::Idle);
    }

    /// Cancel the previous timer and install a fresh one.
    fn restart_timer(&self) -> CancellationToken {
        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let fresh = CancellationToken::new();
        *slot = Some(fresh.clone());
        fresh
    }

    fn take_timer(&self) -> Option<CancellationToken> {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for AsyncValidationGuard {
    fn drop(&mut self) {
        if let Some(timer) = self.take_timer() {
            timer.cancel();
        }
    }
}

impl std::fmt::Debug for AsyncValidationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncValidationGuard")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
