use chrono::{DateTime, Utc};

use taskminder_models::task::Task;

use crate::StorageError;

/// Row shape of the `tasks` table. Timestamps are unix epoch milliseconds.
#[derive(sqlx::FromRow)]
pub struct TaskStorageModel {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub reminder_at: Option<i64>,
    pub notified: bool,
    pub completed: bool,
    pub created_at: i64,
}

impl TryFrom<TaskStorageModel> for Task {
    type Error = StorageError;

    fn try_from(value: TaskStorageModel) -> Result<Self, Self::Error> {
        let id = value.id;
        let reminder_at = value
            .reminder_at
            .map(|millis| parse_timestamp(id, "reminder_at", millis))
            .transpose()?;
        let created_at = parse_timestamp(id, "created_at", value.created_at)?;

        Ok(Self {
            id,
            title: value.title,
            description: value.description,
            reminder_at,
            notified: value.notified,
            completed: value.completed,
            created_at,
        })
    }
}

pub fn to_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}

fn parse_timestamp(id: i64, column: &str, millis: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StorageError::Malformed {
        id,
        reason: format!("{column} is out of range: {millis}"),
    })
}
