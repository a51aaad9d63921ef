use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid recipient {recipient}: {reason}")]
    InvalidRecipient { recipient: String, reason: String },

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Delivers a rendered reminder to a recipient.
///
/// A single call is a single attempt. Retrying is left to the scheduler, which
/// keeps the task due until a delivery succeeds and is committed.
#[async_trait]
pub trait NotificationTransport: Send + Sync + 'static {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;
}
