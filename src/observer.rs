use std::sync::Arc;

use crate::errors::RetryerError;

// ============================================================================
// Lifecycle Observers
// ============================================================================
//
// Notifications only: nothing an observer does can change the control flow
// of the retryer. Hooks are called from the driver task (or from the task
// calling `cancel`) in the order the state machine traverses them.
//
// ============================================================================

/// Receives lifecycle notifications from a retryer
pub trait RetryerObserver<T, E>: Send + Sync {
    /// The operation produced a value. Fired once, before the outcome is sent.
    fn on_success(&self, _value: &T) {
        // Default: do nothing
    }

    /// The retryer resolved with a failure, including cancellation.
    fn on_error(&self, _error: &RetryerError<E>) {
        // Default: do nothing
    }

    /// An attempt failed and will be retried. `failure_count` is 1 for the
    /// first failure.
    fn on_fail(&self, _failure_count: u32, _error: &E) {
        // Default: do nothing
    }

    fn on_pause(&self) {
        // Default: do nothing
    }

    /// Fired when a pause ends and the loop is about to proceed. Never fired
    /// if the retryer resolved while paused.
    fn on_continue(&self) {
        // Default: do nothing
    }
}

type SuccessFn<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorFn<E> = Box<dyn Fn(&RetryerError<E>) + Send + Sync>;
type FailFn<E> = Box<dyn Fn(u32, &E) + Send + Sync>;
type NotifyFn = Box<dyn Fn() + Send + Sync>;

/// Closure-style callbacks, attached through the `on_*` builder methods
pub struct Callbacks<T, E> {
    pub(crate) on_success: Option<SuccessFn<T>>,
    pub(crate) on_error: Option<ErrorFn<E>>,
    pub(crate) on_fail: Option<FailFn<E>>,
    pub(crate) on_pause: Option<NotifyFn>,
    pub(crate) on_continue: Option<NotifyFn>,
}

impl<T, E> Callbacks<T, E> {
    pub fn is_empty(&self) -> bool {
        self.on_success.is_none()
            && self.on_error.is_none()
            && self.on_fail.is_none()
            && self.on_pause.is_none()
            && self.on_continue.is_none()
    }
}

impl<T, E> Default for Callbacks<T, E> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_fail: None,
            on_pause: None,
            on_continue: None,
        }
    }
}

impl<T, E> RetryerObserver<T, E> for Callbacks<T, E> {
    fn on_success(&self, value: &T) {
        if let Some(f) = &self.on_success {
            f(value);
        }
    }

    fn on_error(&self, error: &RetryerError<E>) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    fn on_fail(&self, failure_count: u32, error: &E) {
        if let Some(f) = &self.on_fail {
            f(failure_count, error);
        }
    }

    fn on_pause(&self) {
        if let Some(f) = &self.on_pause {
            f();
        }
    }

    fn on_continue(&self) {
        if let Some(f) = &self.on_continue {
            f();
        }
    }
}

/// Fans notifications out to every attached observer, in attachment order
pub(crate) struct Observers<T, E> {
    observers: Vec<Arc<dyn RetryerObserver<T, E>>>,
}

impl<T, E> Observers<T, E> {
    pub(crate) fn new(observers: Vec<Arc<dyn RetryerObserver<T, E>>>) -> Self {
        Self { observers }
    }
}

impl<T, E> RetryerObserver<T, E> for Observers<T, E> {
    fn on_success(&self, value: &T) {
        self.observers.iter().for_each(|o| o.on_success(value));
    }

    fn on_error(&self, error: &RetryerError<E>) {
        self.observers.iter().for_each(|o| o.on_error(error));
    }

    fn on_fail(&self, failure_count: u32, error: &E) {
        self.observers.iter().for_each(|o| o.on_fail(failure_count, error));
    }

    fn on_pause(&self) {
        self.observers.iter().for_each(|o| o.on_pause());
    }

    fn on_continue(&self) {
        self.observers.iter().for_each(|o| o.on_continue());
    }
}
