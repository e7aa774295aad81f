//! Publish-next-post orchestration.
//!
//! Composes the next-post provider, governor, and platform seam with
//! bounded retries. Publish failures never propagate past this module;
//! the tick loop must not abort because one schedule's publish failed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::governor::Governor;
use crate::platforms::Platform;
use crate::store::NextPostProvider;
use crate::types::{QueuedPost, Schedule};

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Publishes a schedule's next queued post to all its accounts.
pub struct PostPublisher {
    provider: Arc<dyn NextPostProvider>,
    platform: Arc<dyn Platform>,
    governor: Arc<Governor>,
    options: PublishOptions,
}

impl PostPublisher {
    pub fn new(
        provider: Arc<dyn NextPostProvider>,
        platform: Arc<dyn Platform>,
        governor: Arc<Governor>,
    ) -> Self {
        Self {
            provider,
            platform,
            governor,
            options: PublishOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PublishOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish the schedule's next queued post, if any.
    ///
    /// Never returns an error: an empty queue and an empty account list are
    /// quiet no-ops, and exhausted retries are logged and swallowed. The
    /// caller remains responsible for advancing `last_triggered` and
    /// persisting the schedule.
    pub async fn publish_next(&self, schedule: &Schedule) {
        if !schedule.is_active {
            return;
        }

        let post = match self.provider.next_post(schedule).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                debug!(schedule = %schedule.name, "queue empty, nothing to publish");
                return;
            }
            Err(e) => {
                warn!(schedule = %schedule.name, "failed to fetch next post: {}", e);
                return;
            }
        };

        if schedule.accounts.is_empty() {
            debug!(schedule = %schedule.name, "no target accounts configured");
            return;
        }

        let mut any_success = false;
        for account in &schedule.accounts {
            if self.publish_with_retry(&post, account).await {
                any_success = true;
            }
        }

        if any_success {
            if let Err(e) = self.provider.mark_republished(&post.id).await {
                warn!(post_id = %post.id, "failed to mark post republished: {}", e);
            }
        }
    }

    /// Up to `max_attempts` tries with a fixed pause between them; every
    /// attempt passes through the governor first.
    async fn publish_with_retry(&self, post: &QueuedPost, account: &str) -> bool {
        let max_attempts = self.options.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            self.governor.wait(None).await;

            match self.platform.publish(post, account).await {
                Ok(platform_post_id) => {
                    info!(
                        account,
                        post_id = %post.id,
                        platform_post_id,
                        "published"
                    );
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        account,
                        post_id = %post.id,
                        "publish attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt,
                        max_attempts,
                        e,
                        self.options.retry_delay
                    );
                    sleep(self.options.retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        account,
                        post_id = %post.id,
                        "giving up after {} attempts: {}",
                        max_attempts,
                        e
                    );
                }
            }
        }

        false
    }
}
