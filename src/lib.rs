//! Retrying task executor.
//!
//! A [`Retryer`] runs one fallible async operation, retries it according to a
//! [`RetryPolicy`] and [`RetryDelay`], pauses between attempts while the
//! [`PauseGate`] is closed (consumer not focused, or offline in
//! [`ExecutionMode::Online`]), and resolves exactly once with a success
//! value, the last operation error, or a cancellation.

pub mod config;
pub mod delay;
pub mod errors;
pub mod gate;
pub mod metrics;
pub mod observer;
pub mod policy;
pub mod retryer;
pub mod signals;

pub use config::{RetrySetting, RetrySettings};
pub use delay::{Delay, TokioDelay};
pub use errors::{CancelOptions, ConfigError, RetryerError};
pub use gate::{ExecutionMode, PauseGate};
pub use metrics::{MetricsObserver, RetryerMetrics};
pub use observer::{Callbacks, RetryerObserver};
pub use policy::{default_retry_delay, BackoffConfig, RetryDelay, RetryPolicy};
pub use retryer::{Retryer, RetryerConfig, RetryerControl};
pub use signals::{AlwaysActive, AlwaysReachable, ConnectivitySignal, FocusSignal, SignalSwitch};
