//! App-data persistence: the schedule list and draft-post queue.
//!
//! Everything lives in a single JSON document that is read fully and written
//! back as a whole. Saves carry an optimistic version check so an external
//! edit (e.g. the UI changing a schedule while a tick is in flight) fails the
//! save loudly instead of being silently overwritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{RecastError, Result, StoreError};
use crate::types::{QueuedPost, Schedule};

/// The persisted application document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppData {
    /// Monotonic document version, bumped on every save.
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub posts: Vec<QueuedPost>,
}

/// Whole-document persistence for the schedule list.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn load_schedules(&self) -> Result<Vec<Schedule>>;
    async fn save_schedules(&self, schedules: Vec<Schedule>) -> Result<()>;
}

/// Serves the next draft post for a schedule's group.
#[async_trait]
pub trait NextPostProvider: Send + Sync {
    /// Up to `limit` pending posts for the schedule's group, in publish
    /// order: the schedule's explicit `post_order` first, then creation
    /// time as the stable fallback.
    async fn pending_posts(&self, schedule: &Schedule, limit: usize) -> Result<Vec<QueuedPost>>;

    /// Record that a post went out so the queue advances.
    async fn mark_republished(&self, post_id: &str) -> Result<()>;

    async fn next_post(&self, schedule: &Schedule) -> Result<Option<QueuedPost>> {
        Ok(self.pending_posts(schedule, 1).await?.into_iter().next())
    }
}

fn order_pending(schedule: &Schedule, mut pending: Vec<QueuedPost>) -> Vec<QueuedPost> {
    match &schedule.post_order {
        Some(order) => {
            let position = |id: &str| order.iter().position(|o| o == id).unwrap_or(usize::MAX);
            pending.sort_by(|a, b| {
                position(&a.id)
                    .cmp(&position(&b.id))
                    .then(a.created_at.cmp(&b.created_at))
            });
        }
        None => pending.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    pending
}

fn select_pending(schedule: &Schedule, posts: &[QueuedPost], limit: usize) -> Vec<QueuedPost> {
    let pending: Vec<QueuedPost> = posts
        .iter()
        .filter(|p| p.group == schedule.group && p.republished_at.is_none())
        .cloned()
        .collect();
    let mut ordered = order_pending(schedule, pending);
    ordered.truncate(limit);
    ordered
}

/// File-backed JSON store.
///
/// The mutex serializes read-modify-write cycles within the process and
/// tracks the document version seen at the last load, which backs the
/// conflict check on save.
pub struct JsonStore {
    path: PathBuf,
    loaded_version: Mutex<u64>,
}

impl JsonStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            loaded_version: Mutex::new(0),
        }
    }

    async fn read_document(&self) -> Result<AppData> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let data: AppData =
                    serde_json::from_slice(&bytes).map_err(StoreError::DecodeError)?;
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppData::default()),
            Err(e) => Err(StoreError::IoError(e).into()),
        }
    }

    async fn write_document(&self, data: &AppData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::IoError)?;
        }
        let bytes = serde_json::to_vec_pretty(data).map_err(StoreError::DecodeError)?;
        // Write-then-rename so a crash mid-write never truncates the blob.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(StoreError::IoError)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(StoreError::IoError)?;
        Ok(())
    }

    /// Load the full document, remembering its version for the next save.
    pub async fn load(&self) -> Result<AppData> {
        let mut loaded = self.loaded_version.lock().await;
        let data = self.read_document().await?;
        *loaded = data.version;
        Ok(data)
    }

    /// Replace the queued posts wholesale (used by import tooling).
    pub async fn save_posts(&self, posts: Vec<QueuedPost>) -> Result<()> {
        let mut loaded = self.loaded_version.lock().await;
        let mut data = self.read_document().await?;
        data.version += 1;
        data.posts = posts;
        self.write_document(&data).await?;
        *loaded = data.version;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for JsonStore {
    async fn load_schedules(&self) -> Result<Vec<Schedule>> {
        let mut loaded = self.loaded_version.lock().await;
        let data = self.read_document().await?;
        *loaded = data.version;
        Ok(data.schedules)
    }

    async fn save_schedules(&self, schedules: Vec<Schedule>) -> Result<()> {
        let mut loaded = self.loaded_version.lock().await;
        let mut data = self.read_document().await?;
        if data.version != *loaded {
            return Err(RecastError::Store(StoreError::Conflict {
                expected: *loaded,
                found: data.version,
            }));
        }
        data.version += 1;
        data.schedules = schedules;
        self.write_document(&data).await?;
        *loaded = data.version;
        Ok(())
    }
}

#[async_trait]
impl NextPostProvider for JsonStore {
    async fn pending_posts(&self, schedule: &Schedule, limit: usize) -> Result<Vec<QueuedPost>> {
        let data = self.read_document().await?;
        Ok(select_pending(schedule, &data.posts, limit))
    }

    async fn mark_republished(&self, post_id: &str) -> Result<()> {
        let mut loaded = self.loaded_version.lock().await;
        let mut data = self.read_document().await?;
        match data.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => post.republished_at = Some(Utc::now()),
            None => {
                return Err(RecastError::NotFound(format!(
                    "queued post not found: {}",
                    post_id
                )))
            }
        }
        data.version += 1;
        self.write_document(&data).await?;
        // Track our own bump so a schedule save later in the same tick
        // does not self-conflict.
        *loaded = data.version;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
pub struct MemoryStore {
    data: Mutex<AppData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(AppData::default()),
        }
    }

    pub async fn insert_schedule(&self, schedule: Schedule) {
        self.data.lock().await.schedules.push(schedule);
    }

    pub async fn insert_post(&self, post: QueuedPost) {
        self.data.lock().await.posts.push(post);
    }

    pub async fn schedules(&self) -> Vec<Schedule> {
        self.data.lock().await.schedules.clone()
    }

    pub async fn posts(&self) -> Vec<QueuedPost> {
        self.data.lock().await.posts.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn load_schedules(&self) -> Result<Vec<Schedule>> {
        Ok(self.data.lock().await.schedules.clone())
    }

    async fn save_schedules(&self, schedules: Vec<Schedule>) -> Result<()> {
        self.data.lock().await.schedules = schedules;
        Ok(())
    }
}

#[async_trait]
impl NextPostProvider for MemoryStore {
    async fn pending_posts(&self, schedule: &Schedule, limit: usize) -> Result<Vec<QueuedPost>> {
        let data = self.data.lock().await;
        Ok(select_pending(schedule, &data.posts, limit))
    }

    async fn mark_republished(&self, post_id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        match data.posts.iter_mut().find(|p| p.id == post_id) {
            Some(post) => {
                post.republished_at = Some(Utc::now());
                Ok(())
            }
            None => Err(RecastError::NotFound(format!(
                "queued post not found: {}",
                post_id
            ))),
        }
    }
}
