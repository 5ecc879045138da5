// ============================================================================
// Retryer Errors
// ============================================================================
//
// A retryer resolves exactly once. Everything that is not a success value
// ends up in `RetryerError`: the last operation error once retries stop, an
// explicit cancellation, or a panic inside the operation.
//
// ============================================================================

/// Flags carried by a cancellation. Interpreted by the caller, never by the
/// retryer itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelOptions {
    /// Prior optimistic state should be rolled back
    pub revert: bool,
    /// No error should be surfaced to the user
    pub silent: bool,
}

impl CancelOptions {
    pub fn new(revert: bool, silent: bool) -> Self {
        Self { revert, silent }
    }

    pub fn revert() -> Self {
        Self { revert: true, silent: false }
    }

    pub fn silent() -> Self {
        Self { revert: false, silent: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryerError<E> {
    /// The operation failed and no further attempt will be made
    #[error("operation failed: {0}")]
    Failed(E),

    #[error("operation cancelled (revert: {}, silent: {})", .0.revert, .0.silent)]
    Cancelled(CancelOptions),

    #[error("operation panicked: {0}")]
    Panicked(String),

    /// The driver went away without producing an outcome
    #[error("retryer dropped before completion")]
    Dropped,
}

impl<E> RetryerError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryerError::Cancelled(_))
    }

    pub fn cancel_options(&self) -> Option<CancelOptions> {
        match self {
            RetryerError::Cancelled(options) => Some(*options),
            _ => None,
        }
    }

    /// The operation error, if this outcome came from the operation itself.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryerError::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RetryerError::Failed(_) => "failed",
            RetryerError::Cancelled(_) => "cancelled",
            RetryerError::Panicked(_) => "panicked",
            RetryerError::Dropped => "dropped",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid retry settings: {0}")]
    Parse(#[from] serde_json::Error),
}
