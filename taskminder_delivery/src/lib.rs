mod console;
mod email;
mod telegram;

use std::sync::Arc;

use thiserror::Error;

use taskminder_models::settings::{DeliveryKind, DeliverySettings};
use taskminder_scheduler::NotificationTransport;

pub use console::ConsoleTransport;
pub use email::EmailTransport;
pub use telegram::TelegramTransport;

#[derive(Debug, Error)]
pub enum TransportConfigError {
    #[error("delivery kind is {0:?} but its settings section is missing")]
    MissingSettings(DeliveryKind),

    #[error("invalid email address {address}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("telegram bot token is empty")]
    EmptyToken,
}

/// Builds the transport selected by `settings.kind`.
pub fn transport_from_settings(
    settings: &DeliverySettings,
) -> Result<Arc<dyn NotificationTransport>, TransportConfigError> {
    log::info!("Configuring delivery transport [kind = {:?}]", settings.kind);

    let transport: Arc<dyn NotificationTransport> = match settings.kind {
        DeliveryKind::Console => Arc::new(ConsoleTransport),
        DeliveryKind::Email => {
            let email = settings
                .email
                .as_ref()
                .ok_or(TransportConfigError::MissingSettings(DeliveryKind::Email))?;
            Arc::new(EmailTransport::new(email)?)
        }
        DeliveryKind::Telegram => {
            let telegram = settings
                .telegram
                .as_ref()
                .ok_or(TransportConfigError::MissingSettings(DeliveryKind::Telegram))?;
            Arc::new(TelegramTransport::new(&telegram.token)?)
        }
    };

    Ok(transport)
}
