//! Mock platform for testing publish orchestration.
//!
//! Configurable failure behavior lets tests exercise retry logic without
//! network access. Available in all builds so integration tests can use it.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::types::QueuedPost;

use super::Platform;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// How many publish calls fail before one succeeds. Use a large value
    /// for a platform that never succeeds.
    pub failures_before_success: usize,

    /// Error returned for failing calls.
    pub error: PlatformError,

    /// Simulated network latency.
    pub delay: Duration,

    /// Number of publish calls made.
    pub publish_call_count: Arc<Mutex<usize>>,

    /// (post id, account) pairs that were published, for verification.
    pub published: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            failures_before_success: 0,
            error: PlatformError::Network("mock network error".to_string()),
            delay: Duration::from_millis(0),
            publish_call_count: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A platform where every publish succeeds.
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// A platform that fails the first `failures` publishes, then succeeds.
    pub fn failing_then_success(name: &str, failures: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            failures_before_success: failures,
            ..Default::default()
        })
    }

    /// A platform where every publish fails.
    pub fn always_failing(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            failures_before_success: usize::MAX,
            error: PlatformError::Posting(error.to_string()),
            ..Default::default()
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    pub fn publish_call_count(&self) -> usize {
        *self.config.publish_call_count.lock().unwrap()
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.config.published.lock().unwrap().clone()
    }

    /// Share the counters so a boxed copy can still be inspected.
    pub fn handle(&self) -> MockConfig {
        self.config.clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn publish(&self, post: &QueuedPost, account: &str) -> Result<String> {
        let call = {
            let mut count = self.config.publish_call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if call <= self.config.failures_before_success {
            return Err(self.config.error.clone().into());
        }

        self.config
            .published
            .lock()
            .unwrap()
            .push((post.id.clone(), account.to_string()));
        Ok(format!("{}:mock-{}", self.config.name, post.id))
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::success("test");
        let post = QueuedPost::new("g".to_string(), "hello".to_string());

        let id = platform.publish(&post, "main").await.unwrap();
        assert!(id.starts_with("test:mock-"));
        assert_eq!(platform.publish_call_count(), 1);
        assert_eq!(platform.published(), vec![(post.id.clone(), "main".to_string())]);
    }

    #[tokio::test]
    async fn test_mock_failing_then_success() {
        let platform = MockPlatform::failing_then_success("test", 2);
        let post = QueuedPost::new("g".to_string(), "hello".to_string());

        assert!(platform.publish(&post, "main").await.is_err());
        assert!(platform.publish(&post, "main").await.is_err());
        assert!(platform.publish(&post, "main").await.is_ok());
        assert_eq!(platform.publish_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_always_failing() {
        let platform = MockPlatform::always_failing("test", "relay down");
        let post = QueuedPost::new("g".to_string(), "hello".to_string());

        let err = platform.publish(&post, "main").await.unwrap_err();
        assert!(format!("{}", err).contains("relay down"));
        assert!(platform.published().is_empty());
    }
}
