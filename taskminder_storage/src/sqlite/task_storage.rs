mod model;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::{TaskStorageModel, to_millis};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use taskminder_models::task::{NewTask, Task, TaskId};

use crate::{StorageError, TaskStorage};

const TASK_COLUMNS: &str = "id, title, description, reminder_at, notified, completed, created_at";

pub struct SqliteTaskStorage {
    pool: sqlx::SqlitePool,
}

impl SqliteTaskStorage {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url` and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Task store ready [url = {}]", url);

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TaskStorage for SqliteTaskStorage {
    async fn fetch_due(&self, now: DateTime<Utc>) -> Result<Vec<Task>, StorageError> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks
WHERE reminder_at IS NOT NULL AND reminder_at <= ? AND notified = 0
ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, TaskStorageModel>(&query)
            .bind(to_millis(now))
            .fetch_all(&self.pool)
            .await?;

        // A corrupt row must not hide the other due tasks.
        let tasks = rows
            .into_iter()
            .filter_map(|row| match Task::try_from(row) {
                Ok(task) => Some(task),
                Err(error) => {
                    log::warn!("Skipping malformed due task [error = {}]", error);
                    None
                }
            })
            .collect();

        Ok(tasks)
    }

    async fn mark_notified(&self, id: TaskId) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE tasks SET notified = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }

        Ok(())
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StorageError> {
        let NewTask {
            title,
            description,
            reminder_at,
            completed,
        } = task;
        let query = format!(
            "INSERT INTO tasks (title, description, reminder_at, notified, completed, created_at)
VALUES (?, ?, ?, 0, ?, ?) RETURNING {TASK_COLUMNS}"
        );

        let created_task = sqlx::query_as::<_, TaskStorageModel>(&query)
            .bind(title)
            .bind(description)
            .bind(reminder_at.map(to_millis))
            .bind(completed)
            .bind(to_millis(Utc::now()))
            .fetch_one(&self.pool)
            .await?;

        created_task.try_into()
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StorageError> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        let task = sqlx::query_as::<_, TaskStorageModel>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        task.map(Task::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Timelike};
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    async fn storage() -> SqliteTaskStorage {
        SqliteTaskStorage::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc::now().with_nanosecond(0).unwrap()
    }

    fn tokio_ct(
        future: impl Future<Output = Result<(), TestCaseError>>,
    ) -> Result<(), TestCaseError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[tokio::test]
    pub async fn pay_rent_scenario() {
        let storage = storage().await;
        let now = now();
        let task = storage
            .insert(NewTask::new("Pay rent", Some(now - TimeDelta::minutes(1))))
            .await
            .unwrap();

        let due = storage.fetch_due(now).await.unwrap();
        assert_eq!(due, vec![task.clone()]);

        storage.mark_notified(task.id).await.unwrap();

        assert!(storage.fetch_due(now).await.unwrap().is_empty());
        assert!(storage.get(task.id).await.unwrap().unwrap().notified);
    }

    #[tokio::test]
    pub async fn insert_round_trips_all_fields() {
        let storage = storage().await;
        let reminder_at = now() + TimeDelta::hours(2);
        let new_task = NewTask {
            title: "Dentist".to_owned(),
            description: Some("Bring the referral".to_owned()),
            reminder_at: Some(reminder_at),
            completed: true,
        };

        let task = storage.insert(new_task).await.unwrap();
        let stored = storage.get(task.id).await.unwrap().unwrap();

        assert_eq!(stored, task);
        assert_eq!(stored.title, "Dentist");
        assert_eq!(stored.description.as_deref(), Some("Bring the referral"));
        assert_eq!(stored.reminder_at, Some(reminder_at));
        assert!(stored.completed);
        assert!(!stored.notified);
    }

    #[tokio::test]
    pub async fn due_tasks_are_ordered_by_id() {
        let storage = storage().await;
        let now = now();
        for minutes in [1, 30, 5] {
            storage
                .insert(NewTask::new("task", Some(now - TimeDelta::minutes(minutes))))
                .await
                .unwrap();
        }

        let ids: Vec<TaskId> = storage
            .fetch_due(now)
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.id)
            .collect();

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    pub async fn tasks_without_reminder_or_in_future_are_not_due() {
        let storage = storage().await;
        let now = now();
        storage.insert(NewTask::new("no reminder", None)).await.unwrap();
        storage
            .insert(NewTask::new("later", Some(now + TimeDelta::seconds(1))))
            .await
            .unwrap();
        let exact = storage
            .insert(NewTask::new("exactly now", Some(now)))
            .await
            .unwrap();

        let due = storage.fetch_due(now).await.unwrap();

        assert_eq!(due, vec![exact]);
    }

    #[tokio::test]
    pub async fn mark_notified_is_idempotent_and_never_reverts() {
        let storage = storage().await;
        let task = storage
            .insert(NewTask::new("Call mom", Some(now())))
            .await
            .unwrap();

        storage.mark_notified(task.id).await.unwrap();
        storage.mark_notified(task.id).await.unwrap();

        assert!(storage.get(task.id).await.unwrap().unwrap().notified);
    }

    #[tokio::test]
    pub async fn mark_notified_unknown_task_is_not_found() {
        let storage = storage().await;

        let result = storage.mark_notified(99).await;

        assert!(matches!(result, Err(StorageError::NotFound(99))));
    }

    #[tokio::test]
    pub async fn malformed_row_does_not_hide_other_due_tasks() {
        let storage = storage().await;
        let now = now();
        let good = storage
            .insert(NewTask::new("good", Some(now - TimeDelta::minutes(1))))
            .await
            .unwrap();
        let bad = storage
            .insert(NewTask::new("bad", Some(now - TimeDelta::minutes(1))))
            .await
            .unwrap();
        sqlx::query("UPDATE tasks SET created_at = ? WHERE id = ?")
            .bind(i64::MAX)
            .bind(bad.id)
            .execute(&storage.pool)
            .await
            .unwrap();

        let due = storage.fetch_due(now).await.unwrap();

        assert_eq!(due, vec![good]);
        assert!(matches!(
            storage.get(bad.id).await,
            Err(StorageError::Malformed { id, .. }) if id == bad.id
        ));
    }

    #[tokio::test]
    pub async fn closed_pool_reports_unavailable() {
        let storage = storage().await;
        storage.pool.close().await;

        let result = storage.fetch_due(now()).await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[proptest(async = tokio_ct)]
    async fn fetch_due_selects_exactly_the_due_tasks(
        #[strategy(proptest::collection::vec((proptest::option::of(-3_600i64..3_600), any::<bool>()), 0..12))]
        tasks: Vec<(Option<i64>, bool)>,
    ) {
        let storage = storage().await;
        let now = now();
        let mut expected = vec![];

        for (offset, notified) in tasks {
            let reminder_at = offset.map(|secs| now + TimeDelta::seconds(secs));
            let task = storage.insert(NewTask::new("task", reminder_at)).await.unwrap();
            if notified {
                storage.mark_notified(task.id).await.unwrap();
            }
            if !notified && offset.is_some_and(|secs| secs <= 0) {
                expected.push(task.id);
            }
        }

        let due: Vec<TaskId> = storage
            .fetch_due(now)
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.id)
            .collect();

        prop_assert_eq!(due, expected);
    }
}
