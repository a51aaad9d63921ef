use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use taskminder_models::task::{NewTask, Task, TaskId};

use crate::{StorageError, TaskStorage};

struct InMemoryTaskStore {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

pub struct InMemoryTaskStorage {
    store: RwLock<InMemoryTaskStore>,
}

impl InMemoryTaskStorage {
    pub fn new() -> Self {
        InMemoryTaskStorage {
            store: RwLock::new(InMemoryTaskStore {
                next_id: 1,
                tasks: BTreeMap::new(),
            }),
        }
    }

    /// Drops a task the way the CRUD layer would.
    pub async fn remove(&self, id: TaskId) -> Option<Task> {
        self.store.write().await.tasks.remove(&id)
    }

    pub async fn all(&self) -> Vec<Task> {
        self.store.read().await.tasks.values().cloned().collect()
    }
}

impl Default for InMemoryTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStorage for InMemoryTaskStorage {
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StorageError> {
        let store = self.store.read().await;
        Ok(store
            .tasks
            .values()
            .filter(|task| task.is_due(now))
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, id: TaskId) -> Result<(), StorageError> {
        let mut store = self.store.write().await;
        let task = store.tasks.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        task.notified = true;
        Ok(())
    }

    async fn insert(&self, new_task: NewTask) -> Result<Task, StorageError> {
        let mut store = self.store.write().await;
        let id = store.next_id;
        let task = Task {
            id,
            title: new_task.title,
            description: new_task.description,
            reminder_at: new_task.reminder_at,
            notified: false,
            completed: new_task.completed,
            created_at: Utc::now(),
        };

        store.tasks.insert(id, task.clone());
        store.next_id += 1;
        log::debug!("Inserted task [task_id = {}]", id);

        Ok(task)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let store = self.store.read().await;
        Ok(store.tasks.get(&id).cloned())
    }
}
