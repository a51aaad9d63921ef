use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use taskminder_models::settings::EmailSettings;
use taskminder_scheduler::{DeliveryError, NotificationTransport};

use crate::TransportConfigError;

/// Sends reminders as plain-text mail over SMTP with STARTTLS.
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailTransport {
    pub fn new(settings: &EmailSettings) -> Result<Self, TransportConfigError> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|source| TransportConfigError::InvalidAddress {
                address: settings.from.clone(),
                source,
            })?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        log::info!(
            "SMTP transport configured [host = {}, port = {}, from = {}]",
            settings.smtp_host,
            settings.smtp_port,
            from
        );

        Ok(Self { mailer, from })
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message, DeliveryError> {
        let to = recipient
            .parse::<Mailbox>()
            .map_err(|error| DeliveryError::InvalidRecipient {
                recipient: recipient.to_owned(),
                reason: error.to_string(),
            })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|error| DeliveryError::Rejected(error.to_string()))
    }
}

#[async_trait]
impl NotificationTransport for EmailTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let message = self.build_message(recipient, subject, body)?;

        match self.mailer.send(message).await {
            Ok(_) => Ok(()),
            Err(error) if error.is_permanent() => Err(DeliveryError::Rejected(error.to_string())),
            Err(error) => Err(DeliveryError::Transport(Box::new(error))),
        }
    }
}
