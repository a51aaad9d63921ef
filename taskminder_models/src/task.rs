use chrono::{DateTime, Utc};

pub type TaskId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub notified: bool,
    /// Informational. Due-task selection does not look at it.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// A task is due once its reminder time has passed and it was not notified yet.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.notified && self.reminder_at.is_some_and(|reminder_at| reminder_at <= now)
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl NewTask {
    pub fn new(title: impl Into<String>, reminder_at: Option<DateTime<Utc>>) -> Self {
        Self {
            title: title.into(),
            description: None,
            reminder_at,
            completed: false,
        }
    }
}
