// Private module declarations
mod driver;
mod state;


use futures_util::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RetrySettings;
use crate::delay::{Delay, TokioDelay};
use crate::errors::{CancelOptions, RetryerError};
use crate::gate::{ExecutionMode, PauseGate};
use crate::observer::{Callbacks, Observers, RetryerObserver};
use crate::policy::{RetryDelay, RetryPolicy};
use crate::signals::{AlwaysActive, AlwaysReachable, ConnectivitySignal, FocusSignal};
use driver::{Driver, Operation};
use state::{AbortFn, Outcome, Shared};

// ============================================================================
// Retryer - per-operation retry state machine
// ============================================================================
//
// A retryer is built from a `RetryerConfig`, starts its loop as soon as it is
// spawned, and resolves exactly once with success, the last operation error,
// or a cancellation. It is not reusable; build a new one per invocation.
//
//   let retryer = Retryer::spawn(
//       RetryerConfig::new(|| fetch_profile())
//           .retry(5)
//           .connectivity(network.clone()),
//   );
//   let control = retryer.control();
//   let profile = retryer.await?;
//
// ============================================================================

/// Construction inputs for a single retryer
pub struct RetryerConfig<T, E> {
    name: String,
    operation: Operation<T, E>,
    abort: Option<AbortFn>,
    retry: RetryPolicy<E>,
    retry_delay: RetryDelay<E>,
    execution_mode: ExecutionMode,
    focus: Arc<dyn FocusSignal>,
    connectivity: Arc<dyn ConnectivitySignal>,
    delay: Arc<dyn Delay>,
    callbacks: Callbacks<T, E>,
    observers: Vec<Arc<dyn RetryerObserver<T, E>>>,
}

impl<T, E> RetryerConfig<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F, Fut>(mut operation: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            name: "retryer".to_string(),
            operation: Box::new(move || operation().boxed()),
            abort: None,
            retry: RetryPolicy::default(),
            retry_delay: RetryDelay::default(),
            execution_mode: ExecutionMode::default(),
            focus: Arc::new(AlwaysActive),
            connectivity: Arc::new(AlwaysReachable),
            delay: Arc::new(TokioDelay),
            callbacks: Callbacks::default(),
            observers: Vec::new(),
        }
    }

    /// Label used in logs and metrics
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Best-effort hook run after a cancellation has been delivered
    pub fn abort(mut self, abort: impl Fn() + Send + Sync + 'static) -> Self {
        self.abort = Some(Box::new(abort));
        self
    }

    pub fn retry(mut self, retry: impl Into<RetryPolicy<E>>) -> Self {
        self.retry = retry.into();
        self
    }

    pub fn retry_delay(mut self, retry_delay: impl Into<RetryDelay<E>>) -> Self {
        self.retry_delay = retry_delay.into();
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn focus(mut self, focus: Arc<dyn FocusSignal>) -> Self {
        self.focus = focus;
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn ConnectivitySignal>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Replace the sleep primitive used between attempts
    pub fn delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Apply file-based settings over the current policy, delay and mode
    pub fn settings(self, settings: &RetrySettings) -> Self {
        self.retry(settings.retry_policy::<E>())
            .retry_delay(settings.retry_delay::<E>())
            .execution_mode(settings.execution_mode)
    }

    /// Attach an observer. Observers are notified after the `on_*`
    /// callbacks, in the order they were attached.
    pub fn observer(mut self, observer: Arc<dyn RetryerObserver<T, E>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.callbacks.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&RetryerError<E>) + Send + Sync + 'static) -> Self {
        self.callbacks.on_error = Some(Box::new(f));
        self
    }

    pub fn on_fail(mut self, f: impl Fn(u32, &E) + Send + Sync + 'static) -> Self {
        self.callbacks.on_fail = Some(Box::new(f));
        self
    }

    pub fn on_pause(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_pause = Some(Box::new(f));
        self
    }

    pub fn on_continue(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.on_continue = Some(Box::new(f));
        self
    }
}

/// Control surface of a running retryer. Cheap to clone and safe to use from
/// any task.
pub struct RetryerControl<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for RetryerControl<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> RetryerControl<T, E> {
    /// Resolve as cancelled if not yet resolved, then run the abort hook.
    /// The outcome is delivered before this returns.
    pub fn cancel(&self, options: CancelOptions) {
        self.shared.cancel(options);
    }

    /// Re-check the pause gate and wake a parked pause if it now permits
    /// execution. A no-op when not paused or still gated.
    pub fn resume(&self) {
        self.shared.resume();
    }

    /// Stop scheduling attempts. The in-flight attempt is left running and its
    /// failure becomes the outcome.
    pub fn cancel_retry(&self) {
        self.shared.set_retry_cancelled(true);
    }

    pub fn continue_retry(&self) {
        self.shared.set_retry_cancelled(false);
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.is_resolved()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.is_paused()
    }

    pub fn failure_count(&self) -> u32 {
        self.shared.failure_count()
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }
}

/// Handle to a running retryer. Awaiting it yields the terminal outcome.
pub struct Retryer<T, E> {
    control: RetryerControl<T, E>,
    outcome: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> Retryer<T, E>
where
    T: Send + 'static,
    E: std::fmt::Debug + Send + 'static,
{
    /// Start the retry loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(config: RetryerConfig<T, E>) -> Self {
        let RetryerConfig {
            name,
            operation,
            abort,
            retry,
            retry_delay,
            execution_mode,
            focus,
            connectivity,
            delay,
            callbacks,
            observers,
        } = config;

        let mut all_observers: Vec<Arc<dyn RetryerObserver<T, E>>> = Vec::new();
        if !callbacks.is_empty() {
            all_observers.push(Arc::new(callbacks));
        }
        all_observers.extend(observers);

        let (completer, outcome) = oneshot::channel();
        let shared = Arc::new(Shared::new(
            name,
            PauseGate::new(focus, connectivity, execution_mode),
            Observers::new(all_observers),
            abort,
            completer,
        ));

        let span = tracing::info_span!(
            "retryer",
            retryer_id = %shared.id,
            operation = %shared.name,
        );
        tracing::debug!(
            retryer_id = %shared.id,
            operation = %shared.name,
            retry = ?retry,
            retry_delay = ?retry_delay,
            mode = ?execution_mode,
            "starting retryer"
        );

        let driver = Driver {
            shared: shared.clone(),
            operation,
            retry,
            retry_delay,
            delay,
        };
        tokio::spawn(driver.run().instrument(span));

        Self {
            control: RetryerControl { shared },
            outcome,
        }
    }
}

impl<T, E> Retryer<T, E> {
    pub fn control(&self) -> RetryerControl<T, E> {
        self.control.clone()
    }

    pub fn cancel(&self, options: CancelOptions) {
        self.control.cancel(options);
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn cancel_retry(&self) {
        self.control.cancel_retry();
    }

    pub fn continue_retry(&self) {
        self.control.continue_retry();
    }

    pub fn is_resolved(&self) -> bool {
        self.control.is_resolved()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn failure_count(&self) -> u32 {
        self.control.failure_count()
    }

    pub fn id(&self) -> Uuid {
        self.control.id()
    }

    /// Wait for the terminal outcome
    pub async fn outcome(self) -> Result<T, RetryerError<E>> {
        self.await
    }
}

impl<T, E> Future for Retryer<T, E> {
    type Output = Result<T, RetryerError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RetryerError::Dropped)))
    }
}
