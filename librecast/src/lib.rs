//! Recast - Unix tools for recycling your post backlog
//!
//! This library provides the scheduling core for republishing backed-up and
//! drafted posts: recurrence resolution, trigger evaluation, and rate-governed
//! publishing through an external posting command.

pub mod config;
pub mod error;
pub mod governor;
pub mod platforms;
pub mod publish;
pub mod recurrence;
pub mod store;
pub mod trigger;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{RecastError, Result};
pub use governor::Governor;
pub use publish::{PostPublisher, PublishOptions};
pub use store::{AppData, JsonStore, MemoryStore, NextPostProvider, ScheduleStore};
pub use trigger::{ScheduleLookups, TriggerEvaluator};
pub use types::{IntervalUnit, QueuedPost, Schedule, ScheduleFrequency, Weekday};
