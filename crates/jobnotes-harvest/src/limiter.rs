use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};

use crate::config::DelayRange;

/// Single token bucket refilled after a random pause.
///
/// Every `acquire` takes the token, waiting for it when the previous holder
/// acquired it less than a sampled delay ago. Waiters queue on a fair mutex
/// and are served in arrival order.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    range: DelayRange,
    refill_at: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(range: DelayRange) -> Self {
        Self {
            range,
            refill_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn range(&self) -> DelayRange {
        self.range
    }

    pub async fn acquire(&self) {
        let mut refill_at = self.refill_at.lock().await;
        if let Some(at) = refill_at.take() {
            time::sleep_until(at).await;
        }
        let delay = self.range.sample();
        if !delay.is_zero() {
            log::trace!("Next permit in {:.2}s", delay.as_secs_f32());
            *refill_at = Some(Instant::now() + delay);
        }
    }
}
