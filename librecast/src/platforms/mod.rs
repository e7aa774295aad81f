//! Platform publish seam.
//!
//! Actual platform clients live outside this crate; all the scheduling core
//! needs is the ability to hand a post and a target account to something
//! that can publish it. The command platform delegates to an external
//! posting tool, and the mock platform backs the tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::QueuedPost;

pub mod command;
pub mod mock;

/// A publish capability for one family of accounts.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Publish `post` to `account`.
    ///
    /// Returns a platform-specific post id on success.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Posting` or `PlatformError::Network`; the
    /// caller treats either as retryable.
    async fn publish(&self, post: &QueuedPost, account: &str) -> Result<String>;

    /// Lowercase identifier used in logs.
    fn name(&self) -> &str;
}
