use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Retry Policy Evaluation
// ============================================================================
//
// Two independent questions are asked after every failed attempt:
//
// - RetryPolicy: should another attempt follow?
// - RetryDelay:  how long to wait before it?
//
// Both see the failure count *before* it is incremented for the retry, and
// the error of the attempt that just failed.
//
// ============================================================================

type ShouldRetryFn<E> = Arc<dyn Fn(u32, &E) -> bool + Send + Sync>;
type RetryDelayFn<E> = Arc<dyn Fn(u32, &E) -> Duration + Send + Sync>;

/// Decides whether a failed attempt is followed by another one
pub enum RetryPolicy<E> {
    /// Never retry
    Never,
    /// Retry until cancelled
    Forever,
    /// Retry while `failure_count < n`
    Limit(u32),
    /// Retry iff the predicate returns true for `(failure_count, error)`
    Predicate(ShouldRetryFn<E>),
}

impl<E> RetryPolicy<E> {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(u32, &E) -> bool + Send + Sync + 'static,
    {
        RetryPolicy::Predicate(Arc::new(f))
    }

    pub fn should_retry(&self, failure_count: u32, error: &E) -> bool {
        match self {
            RetryPolicy::Never => false,
            RetryPolicy::Forever => true,
            RetryPolicy::Limit(max) => failure_count < *max,
            RetryPolicy::Predicate(f) => f(failure_count, error),
        }
    }
}

impl<E> Default for RetryPolicy<E> {
    fn default() -> Self {
        RetryPolicy::Limit(3)
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        match self {
            RetryPolicy::Never => RetryPolicy::Never,
            RetryPolicy::Forever => RetryPolicy::Forever,
            RetryPolicy::Limit(max) => RetryPolicy::Limit(*max),
            RetryPolicy::Predicate(f) => RetryPolicy::Predicate(f.clone()),
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicy::Never => write!(f, "Never"),
            RetryPolicy::Forever => write!(f, "Forever"),
            RetryPolicy::Limit(max) => write!(f, "Limit({})", max),
            RetryPolicy::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl<E> From<bool> for RetryPolicy<E> {
    fn from(retry: bool) -> Self {
        if retry {
            RetryPolicy::Forever
        } else {
            RetryPolicy::Never
        }
    }
}

impl<E> From<u32> for RetryPolicy<E> {
    fn from(max: u32) -> Self {
        RetryPolicy::Limit(max)
    }
}

/// Exponential backoff parameters
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor per failure
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Short waits for latency-sensitive operations
    pub fn aggressive() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }

    /// Long waits for operations against a struggling backend
    pub fn conservative() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 3.0,
        }
    }

    /// `min(initial * multiplier^failure_count, max)`
    pub fn delay_for(&self, failure_count: u32) -> Duration {
        let exponent = i32::try_from(failure_count).unwrap_or(i32::MAX);
        let base_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// `min(1000 * 2^failure_count, 30000)` milliseconds
pub fn default_retry_delay(failure_count: u32) -> Duration {
    BackoffConfig::default().delay_for(failure_count)
}

/// How long to wait before the next attempt
pub enum RetryDelay<E> {
    Fixed(Duration),
    Backoff(BackoffConfig),
    Computed(RetryDelayFn<E>),
}

impl<E> RetryDelay<E> {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(u32, &E) -> Duration + Send + Sync + 'static,
    {
        RetryDelay::Computed(Arc::new(f))
    }

    pub fn delay_for(&self, failure_count: u32, error: &E) -> Duration {
        match self {
            RetryDelay::Fixed(delay) => *delay,
            RetryDelay::Backoff(config) => config.delay_for(failure_count),
            RetryDelay::Computed(f) => f(failure_count, error),
        }
    }
}

impl<E> Default for RetryDelay<E> {
    fn default() -> Self {
        RetryDelay::Backoff(BackoffConfig::default())
    }
}

impl<E> Clone for RetryDelay<E> {
    fn clone(&self) -> Self {
        match self {
            RetryDelay::Fixed(delay) => RetryDelay::Fixed(*delay),
            RetryDelay::Backoff(config) => RetryDelay::Backoff(config.clone()),
            RetryDelay::Computed(f) => RetryDelay::Computed(f.clone()),
        }
    }
}

impl<E> fmt::Debug for RetryDelay<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDelay::Fixed(delay) => write!(f, "Fixed({:?})", delay),
            RetryDelay::Backoff(config) => write!(f, "Backoff({:?})", config),
            RetryDelay::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

impl<E> From<Duration> for RetryDelay<E> {
    fn from(delay: Duration) -> Self {
        RetryDelay::Fixed(delay)
    }
}
