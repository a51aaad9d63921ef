use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use taskminder_models::task::Task;
use taskminder_storage::{StorageError, TaskStorage};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("task store unavailable while scanning for due tasks: {0}")]
    StoreUnavailable(#[source] StorageError),

    #[error("scanning for due tasks failed: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for ScanError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Unavailable(_) => ScanError::StoreUnavailable(error),
            error => ScanError::Storage(error),
        }
    }
}

pub struct DueTaskScanner {
    storage: Arc<dyn TaskStorage>,
    skip_completed: bool,
}

impl DueTaskScanner {
    pub fn new(storage: Arc<dyn TaskStorage>) -> Self {
        Self {
            storage,
            skip_completed: false,
        }
    }

    /// Drop completed tasks from each batch instead of reminding about them.
    pub fn skip_completed(mut self, skip_completed: bool) -> Self {
        self.skip_completed = skip_completed;
        self
    }

    /// Tasks due at `now`, ordered by id. Reads the store on every call.
    pub async fn fetch_due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>, ScanError> {
        let mut tasks = self
            .storage
            .fetch_due(now)
            .await?;

        tasks.sort_by_key(|task| task.id);

        if self.skip_completed {
            let before = tasks.len();
            tasks.retain(|task| !task.completed);
            if before != tasks.len() {
                log::debug!(
                    "Skipped completed due tasks [count = {}]",
                    before - tasks.len()
                );
            }
        }

        Ok(tasks)
    }
}
