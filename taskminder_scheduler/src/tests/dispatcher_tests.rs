use std::sync::Arc;

use chrono::TimeDelta;
use chrono_tz::Tz;

use super::test_utils::{FaultyStorage, RECIPIENT, RecordingTransport, SentMessage};
use crate::{DispatchError, MessageTemplate, NotificationDispatcher};

struct TestContext {
    storage: Arc<FaultyStorage>,
    transport: Arc<RecordingTransport>,
    dispatcher: NotificationDispatcher,
}

impl TestContext {
    fn new() -> Self {
        let storage = FaultyStorage::new();
        let transport = RecordingTransport::new();
        let dispatcher =
            NotificationDispatcher::new(storage.clone(), transport.clone(), RECIPIENT);

        Self {
            storage,
            transport,
            dispatcher,
        }
    }
}

#[tokio::test]
pub async fn delivers_then_commits() {
    let ctx = TestContext::new();
    let task = ctx.storage.add_due("Pay rent", TimeDelta::minutes(1)).await;

    ctx.dispatcher.process(&task).await.unwrap();

    assert_eq!(
        ctx.transport.sent(),
        vec![SentMessage {
            recipient: RECIPIENT.to_owned(),
            subject: "Task Reminder: Pay rent".to_owned(),
            body: "Reminder for task: Pay rent".to_owned(),
        }]
    );
    assert!(ctx.storage.is_notified(task.id).await);
}

#[tokio::test]
pub async fn dispatch_alone_does_not_touch_the_store() {
    let ctx = TestContext::new();
    let task = ctx.storage.add_due("Pay rent", TimeDelta::minutes(1)).await;

    ctx.dispatcher.dispatch(&task).await.unwrap();

    assert_eq!(ctx.transport.sent().len(), 1);
    assert!(!ctx.storage.is_notified(task.id).await);
}

#[tokio::test]
pub async fn delivery_failure_leaves_task_unmodified() {
    let ctx = TestContext::new();
    let task = ctx.storage.add_due("Pay rent", TimeDelta::minutes(1)).await;
    ctx.transport.fail_for("Pay rent");

    let result = ctx.dispatcher.process(&task).await;

    let error = result.unwrap_err();
    assert!(matches!(error, DispatchError::DeliveryFailed { task_id, .. } if task_id == task.id));
    assert!(!error.is_duplicate_risk());
    assert_eq!(ctx.transport.attempts(), 1);
    assert!(!ctx.storage.is_notified(task.id).await);
}

#[tokio::test]
pub async fn commit_failure_after_delivery_is_a_duplicate_risk() {
    let ctx = TestContext::new();
    let task = ctx.storage.add_due("Pay rent", TimeDelta::minutes(1)).await;
    ctx.storage.fail_commit_for(task.id);

    let result = ctx.dispatcher.process(&task).await;

    let error = result.unwrap_err();
    assert!(matches!(error, DispatchError::CommitFailed { task_id, .. } if task_id == task.id));
    assert!(error.is_duplicate_risk());
    assert!(ctx.transport.delivered_title("Pay rent"));
    assert!(!ctx.storage.is_notified(task.id).await);
}

#[tokio::test]
pub async fn task_deleted_mid_dispatch_is_reported_as_removed() {
    let ctx = TestContext::new();
    let task = ctx.storage.add_due("Pay rent", TimeDelta::minutes(1)).await;
    ctx.storage.inner.remove(task.id).await;

    let result = ctx.dispatcher.process(&task).await;

    let error = result.unwrap_err();
    assert!(matches!(error, DispatchError::TaskRemoved { task_id } if task_id == task.id));
    assert!(!error.is_duplicate_risk());
}

#[tokio::test]
pub async fn uses_configured_template() {
    let storage = FaultyStorage::new();
    let transport = RecordingTransport::new();
    let template = MessageTemplate::new("Due: {title}", "Task #{id}", Tz::UTC);
    let dispatcher = NotificationDispatcher::new(storage.clone(), transport.clone(), RECIPIENT)
        .with_template(template);
    let task = storage.add_due("Pay rent", TimeDelta::minutes(1)).await;

    dispatcher.process(&task).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent[0].subject, "Due: Pay rent");
    assert_eq!(sent[0].body, format!("Task #{}", task.id));
}
