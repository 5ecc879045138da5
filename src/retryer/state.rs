use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::{CancelOptions, RetryerError};
use crate::gate::PauseGate;
use crate::observer::{Observers, RetryerObserver};

pub(crate) type Outcome<T, E> = Result<T, RetryerError<E>>;
pub(crate) type AbortFn = Box<dyn Fn() + Send + Sync>;

// ============================================================================
// Shared Retryer State
// ============================================================================
//
// Owned by the driver task and reachable from every control handle.
//
// - completer:      single-assignment slot holding the outcome sender. Taking
//                   the sender *is* resolution, so a second resolve finds the
//                   slot empty and does nothing.
// - pending_resume: present only while the driver is parked in a pause.
// - token:          fired on resolution to interrupt the in-flight attempt
//                   and the inter-attempt delay.
//
// ============================================================================

pub(crate) struct Shared<T, E> {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) gate: PauseGate,
    pub(crate) observers: Observers<T, E>,
    pub(crate) token: CancellationToken,
    completer: Mutex<Option<oneshot::Sender<Outcome<T, E>>>>,
    pending_resume: Mutex<Option<oneshot::Sender<()>>>,
    retry_cancelled: AtomicBool,
    failure_count: AtomicU32,
    abort: Option<AbortFn>,
}

fn lock<X>(mutex: &Mutex<X>) -> MutexGuard<'_, X> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T, E> Shared<T, E> {
    pub(crate) fn new(
        name: String,
        gate: PauseGate,
        observers: Observers<T, E>,
        abort: Option<AbortFn>,
        completer: oneshot::Sender<Outcome<T, E>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            gate,
            observers,
            token: CancellationToken::new(),
            completer: Mutex::new(Some(completer)),
            pending_resume: Mutex::new(None),
            retry_cancelled: AtomicBool::new(false),
            failure_count: AtomicU32::new(0),
            abort,
        }
    }

    pub(crate) fn is_resolved(&self) -> bool {
        lock(&self.completer).is_none()
    }

    pub(crate) fn is_paused(&self) -> bool {
        lock(&self.pending_resume).is_some()
    }

    pub(crate) fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Returns the incremented count, or `None` once resolved. Holding the
    /// completer lock keeps a concurrent resolve out. Only the driver calls
    /// this.
    pub(crate) fn record_failure(&self) -> Option<u32> {
        let completer = lock(&self.completer);
        completer.as_ref()?;
        Some(self.failure_count.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn is_retry_cancelled(&self) -> bool {
        self.retry_cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_retry_cancelled(&self, cancelled: bool) {
        self.retry_cancelled.store(cancelled, Ordering::SeqCst);
    }

    /// Deliver the terminal outcome. Returns false if one was already
    /// delivered.
    pub(crate) fn resolve(&self, outcome: Outcome<T, E>) -> bool {
        let Some(completer) = lock(&self.completer).take() else {
            return false;
        };

        match &outcome {
            Ok(value) => self.observers.on_success(value),
            Err(error) => self.observers.on_error(error),
        }

        self.resume();
        self.token.cancel();

        // The caller may have dropped its handle; the outcome is still final.
        let _ = completer.send(outcome);
        true
    }

    pub(crate) fn cancel(&self, options: CancelOptions) {
        if !self.resolve(Err(RetryerError::Cancelled(options))) {
            return;
        }

        tracing::info!(
            retryer_id = %self.id,
            operation = %self.name,
            revert = options.revert,
            silent = options.silent,
            "retryer cancelled"
        );

        if let Some(abort) = &self.abort {
            if panic::catch_unwind(AssertUnwindSafe(|| abort())).is_err() {
                tracing::warn!(
                    retryer_id = %self.id,
                    operation = %self.name,
                    "abort hook panicked"
                );
            }
        }
    }

    pub(crate) fn park(&self, resume: oneshot::Sender<()>) {
        *lock(&self.pending_resume) = Some(resume);
    }

    pub(crate) fn clear_pending_resume(&self) {
        lock(&self.pending_resume).take();
    }

    /// Wake a parked pause if the retryer resolved or the gate now permits
    /// execution. Otherwise a recheck that changes nothing.
    ///
    /// The gate is read without holding the slot lock, so a signal provider
    /// may itself call `resume` from inside `is_active`/`is_reachable`.
    pub(crate) fn resume(&self) {
        if !self.is_paused() {
            return;
        }

        if self.is_resolved() || self.gate.is_permitted() {
            if let Some(resume) = lock(&self.pending_resume).take() {
                let _ = resume.send(());
            }
        } else {
            tracing::debug!(
                retryer_id = %self.id,
                operation = %self.name,
                "resume requested but gate still closed"
            );
        }
    }
}
