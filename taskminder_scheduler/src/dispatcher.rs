use std::sync::Arc;

use thiserror::Error;

use taskminder_models::task::{Task, TaskId};
use taskminder_storage::{StorageError, TaskStorage};

use crate::{DeliveryError, MessageTemplate, NotificationTransport};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not deliver reminder [task_id = {task_id}]: {source}")]
    DeliveryFailed {
        task_id: TaskId,
        #[source]
        source: DeliveryError,
    },

    #[error("reminder delivered but not marked as notified [task_id = {task_id}]: {source}")]
    CommitFailed {
        task_id: TaskId,
        #[source]
        source: StorageError,
    },

    #[error("task removed before it was marked as notified [task_id = {task_id}]")]
    TaskRemoved { task_id: TaskId },

    #[error("dispatch worker panicked [task_id = {task_id}]")]
    Panicked { task_id: TaskId },
}

impl DispatchError {
    /// True when the reminder may already have reached the recipient while the
    /// task is still due, so the next tick will send it again.
    pub fn is_duplicate_risk(&self) -> bool {
        matches!(
            self,
            DispatchError::CommitFailed { .. } | DispatchError::Panicked { .. }
        )
    }
}

/// Result of processing one due task. `Ok` means delivered and committed.
pub type TaskOutcome = Result<(), DispatchError>;

/// Delivers reminders for due tasks and records the delivery in the store.
#[derive(Clone)]
pub struct NotificationDispatcher {
    storage: Arc<dyn TaskStorage>,
    transport: Arc<dyn NotificationTransport>,
    recipient: String,
    template: MessageTemplate,
}

impl NotificationDispatcher {
    pub fn new(
        storage: Arc<dyn TaskStorage>,
        transport: Arc<dyn NotificationTransport>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            transport,
            recipient: recipient.into(),
            template: MessageTemplate::default(),
        }
    }

    pub fn with_template(mut self, template: MessageTemplate) -> Self {
        self.template = template;
        self
    }

    /// One delivery attempt. Leaves the store untouched.
    pub async fn dispatch(&self, task: &Task) -> Result<(), DispatchError> {
        let message = self.template.render(task);
        self.transport
            .send(&self.recipient, &message.subject, &message.body)
            .await
            .map_err(|source| DispatchError::DeliveryFailed {
                task_id: task.id,
                source,
            })
    }

    pub async fn mark_notified(&self, task_id: TaskId) -> Result<(), DispatchError> {
        match self.storage.mark_notified(task_id).await {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(DispatchError::TaskRemoved { task_id }),
            Err(source) => Err(DispatchError::CommitFailed { task_id, source }),
        }
    }

    /// Delivers the reminder and, only if that succeeded, commits it.
    pub async fn process(&self, task: &Task) -> TaskOutcome {
        log::info!(
            "Sending reminder [task_id = {}, title = {}]",
            task.id,
            task.title
        );

        let result = match self.dispatch(task).await {
            Ok(()) => self.mark_notified(task.id).await,
            Err(error) => Err(error),
        };

        match &result {
            Ok(()) => log::info!(
                "Reminder sent and task marked as notified [task_id = {}]",
                task.id
            ),
            Err(error @ DispatchError::DeliveryFailed { .. }) => {
                log::warn!("{}; task stays due and is retried next tick", error)
            }
            Err(error @ DispatchError::CommitFailed { .. }) => log::error!(
                "[DUPLICATE RISK] {}; the reminder will be sent again next tick",
                error
            ),
            Err(error) => log::warn!("{}", error),
        }

        result
    }
}
