use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;

use super::state::Shared;
use crate::delay::Delay;
use crate::errors::RetryerError;
use crate::observer::RetryerObserver;
use crate::policy::{RetryDelay, RetryPolicy};

pub(crate) type Operation<T, E> = Box<dyn FnMut() -> BoxFuture<'static, Result<T, E>> + Send>;

// ============================================================================
// Retry Control Loop
// ============================================================================
//
//   Idle ──gate open──▶ Running ──Ok──▶ Resolved(success)
//     │                   │
//     └─gate closed─▶ Paused ──▶ Running
//                         │
//                         Err
//                         ▼
//                 Failed-Evaluating ──stop──▶ Resolved(failure)
//                         │ retry
//                         ▼
//              Delaying ──▶ Paused? ──▶ Running
//
// Suspension points: the in-flight attempt, the delay, and the pause. The
// first two race the cancellation token; the pause is woken through the
// pending resume slot, which resolution always fires.
//
// ============================================================================

enum Attempt<T, E> {
    Finished(Result<T, E>),
    Panicked(String),
    /// Resolved from outside while the attempt was in flight
    Interrupted,
}

pub(crate) struct Driver<T, E> {
    pub(crate) shared: Arc<Shared<T, E>>,
    pub(crate) operation: Operation<T, E>,
    pub(crate) retry: RetryPolicy<E>,
    pub(crate) retry_delay: RetryDelay<E>,
    pub(crate) delay: Arc<dyn Delay>,
}

impl<T, E> Driver<T, E>
where
    T: Send + 'static,
    E: std::fmt::Debug + Send + 'static,
{
    pub(crate) async fn run(mut self) {
        if !self.shared.gate.is_permitted() {
            pause(&self.shared).await;
        }

        loop {
            if self.shared.is_resolved() {
                return;
            }

            let error = match self.attempt().await {
                Attempt::Finished(Ok(value)) => {
                    let failure_count = self.shared.failure_count();
                    if failure_count > 0 {
                        tracing::info!(failure_count, "operation succeeded after retry");
                    }
                    self.shared.resolve(Ok(value));
                    return;
                }
                Attempt::Finished(Err(error)) => error,
                Attempt::Panicked(message) => {
                    tracing::error!(panic = %message, "operation panicked");
                    self.shared.resolve(Err(RetryerError::Panicked(message)));
                    return;
                }
                Attempt::Interrupted => return,
            };

            if self.shared.is_resolved() {
                return;
            }

            let failure_count = self.shared.failure_count();
            let delay = self.retry_delay.delay_for(failure_count, &error);
            let should_retry = self.retry.should_retry(failure_count, &error);

            if self.shared.is_retry_cancelled() || !should_retry {
                tracing::error!(
                    failure_count,
                    retry_cancelled = self.shared.is_retry_cancelled(),
                    error = ?error,
                    "operation failed, not retrying"
                );
                self.shared.resolve(Err(RetryerError::Failed(error)));
                return;
            }

            let Some(failure_count) = self.shared.record_failure() else {
                return;
            };
            tracing::warn!(
                failure_count,
                error = ?error,
                delay = ?delay,
                "operation failed, retrying after delay"
            );
            if self.shared.is_resolved() {
                return;
            }
            self.shared.observers.on_fail(failure_count, &error);

            tokio::select! {
                biased;
                () = self.shared.token.cancelled() => return,
                () = self.delay.sleep(delay) => {}
            }

            if !self.shared.gate.is_permitted() {
                pause(&self.shared).await;
            }

            if self.shared.is_retry_cancelled() {
                tracing::info!(failure_count, "retry cancelled while waiting, giving up");
                self.shared.resolve(Err(RetryerError::Failed(error)));
                return;
            }
        }
    }

    async fn attempt(&mut self) -> Attempt<T, E> {
        tracing::debug!(
            failure_count = self.shared.failure_count(),
            "attempting operation"
        );

        // A panic while building the future counts the same as one while
        // polling it.
        let operation = &mut self.operation;
        let future = match panic::catch_unwind(AssertUnwindSafe(|| operation())) {
            Ok(future) => future,
            Err(payload) => return Attempt::Panicked(panic_message(payload.as_ref())),
        };

        tokio::select! {
            biased;
            () = self.shared.token.cancelled() => Attempt::Interrupted,
            result = AssertUnwindSafe(future).catch_unwind() => match result {
                Ok(result) => Attempt::Finished(result),
                Err(payload) => Attempt::Panicked(panic_message(payload.as_ref())),
            },
        }
    }
}

/// Park until resumed or resolved. Takes the shared state rather than the
/// driver so the suspended future only borrows `Sync` data.
async fn pause<T, E>(shared: &Shared<T, E>) {
    if shared.is_resolved() {
        return;
    }

    let (resume, resumed) = oneshot::channel();
    shared.park(resume);

    // A resume() that raced the caller's gate read found no slot to wake.
    // Re-reading the gate after parking closes that window. Resolution is
    // checked last since a signal provider may cancel from inside the read.
    if shared.gate.is_permitted() || shared.is_resolved() {
        shared.clear_pending_resume();
        return;
    }

    tracing::info!("retryer paused");
    shared.observers.on_pause();

    tokio::select! {
        _ = resumed => {}
        () = shared.token.cancelled() => {}
    }
    shared.clear_pending_resume();

    if !shared.is_resolved() {
        tracing::info!("retryer continuing");
        shared.observers.on_continue();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
