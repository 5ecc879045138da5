use async_trait::async_trait;
use std::time::Duration;

/// Sleep primitive used between attempts.
///
/// Implementations do not need to be cancellable themselves; the driver races
/// every sleep against the retryer's cancellation token.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer backed delay
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
