//! Outbound-call pacing for platform publishes.
//!
//! Platforms throttle aggressively; the governor enforces a minimum spacing
//! between calls so sequential publish paths never burst.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Enforces a minimum interval between successive `wait` calls.
///
/// Holds a single shared last-call timestamp; callers are expected to be
/// cooperative and sequential, which holds for every publish path in this
/// crate.
pub struct Governor {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Governor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Suspend until at least the configured interval (or the override)
    /// has passed since the previous `wait` returned, then record the new
    /// last-call timestamp.
    pub async fn wait(&self, override_interval: Option<Duration>) {
        let interval = override_interval.unwrap_or(self.interval);
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let governor = Governor::new(Duration::from_millis(200));

        let start = Instant::now();
        governor.wait(None).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_call_is_spaced() {
        let governor = Governor::new(Duration::from_millis(100));

        let start = Instant::now();
        governor.wait(None).await;
        governor.wait(None).await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_override_interval_applies() {
        let governor = Governor::new(Duration::from_millis(500));

        let start = Instant::now();
        governor.wait(None).await;
        governor.wait(Some(Duration::from_millis(50))).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_no_wait_after_interval_already_elapsed() {
        let governor = Governor::new(Duration::from_millis(50));

        governor.wait(None).await;
        sleep(Duration::from_millis(80)).await;

        let start = Instant::now();
        governor.wait(None).await;
        assert!(start.elapsed() < Duration::from_millis(30));
    }
}
