use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation flag shared between a caller and a running pipeline.
///
/// The aggregator checks it before each sample point and races it against
/// the rate limiter, so a cancel never waits out a throttle delay.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// `Err(Cancelled)` once cancelled
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::AirError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is cancelled, immediately if it already is
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // the sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}
