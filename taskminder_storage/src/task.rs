use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use taskminder_models::task::{NewTask, Task, TaskId};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("task store is unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("could not migrate task store: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("task does not exist [task_id = {0}]")]
    NotFound(TaskId),

    #[error("stored task is malformed [task_id = {id}, reason = {reason}]")]
    Malformed { id: TaskId, reason: String },
}

/// The task store as seen by the reminder scheduler.
///
/// Implementations are the single source of truth for the `notified` flag:
/// every call goes to the backing store, nothing is cached.
#[async_trait]
pub trait TaskStorage: Send + Sync {
    /// Tasks with `reminder_at <= now` and `notified == false`, ordered by id.
    /// Tasks without a reminder are never returned.
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StorageError>;

    /// Sets `notified` to true. Marking an already notified task succeeds and
    /// changes nothing. Fails with [`StorageError::NotFound`] for unknown ids.
    async fn mark_notified(&self, id: TaskId) -> Result<(), StorageError>;

    async fn insert(&self, task: NewTask) -> Result<Task, StorageError>;
    async fn get(&self, id: TaskId) -> Result<Option<Task>, StorageError>;
}
