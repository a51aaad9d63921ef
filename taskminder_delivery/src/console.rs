use async_trait::async_trait;

use taskminder_scheduler::{DeliveryError, NotificationTransport};

/// Writes reminders to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleTransport;

#[async_trait]
impl NotificationTransport for ConsoleTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        log::info!(
            "Reminder [recipient = {}, subject = {}, body = {}]",
            recipient,
            subject,
            body
        );
        Ok(())
    }
}
