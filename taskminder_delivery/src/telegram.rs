use async_trait::async_trait;
use teloxide::{ApiError, RequestError, prelude::*};

use taskminder_scheduler::{DeliveryError, NotificationTransport};

use crate::TransportConfigError;

/// Sends reminders as Telegram messages. The recipient is a numeric chat id.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Result<Self, TransportConfigError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TransportConfigError::EmptyToken);
        }

        Ok(Self {
            bot: Bot::new(token),
        })
    }
}

#[async_trait]
impl NotificationTransport for TelegramTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let chat_id = parse_chat_id(recipient)?;

        self.bot
            .send_message(chat_id, message_text(subject, body))
            .await
            .map_err(map_request_error)?;

        Ok(())
    }
}

fn parse_chat_id(recipient: &str) -> Result<ChatId, DeliveryError> {
    recipient
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|error| DeliveryError::InvalidRecipient {
            recipient: recipient.to_owned(),
            reason: format!("expected a numeric chat id: {error}"),
        })
}

fn message_text(subject: &str, body: &str) -> String {
    format!("{subject}\n\n{body}")
}

fn map_request_error(error: RequestError) -> DeliveryError {
    match error {
        RequestError::Api(ApiError::ChatNotFound | ApiError::BotBlocked) => {
            DeliveryError::Rejected(error.to_string())
        }
        error => DeliveryError::Transport(Box::new(error)),
    }
}
