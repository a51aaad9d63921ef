mod appsettings;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, ensure};

use taskminder_delivery::transport_from_settings;
use taskminder_scheduler::{DueTaskScheduler, MessageTemplate, SchedulerConfig};
use taskminder_storage::SqliteTaskStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let settings = appsettings::load().context("failed to load appsettings")?;
    ensure!(
        !settings.delivery.recipient.trim().is_empty(),
        "delivery.recipient must not be empty"
    );

    let config = SchedulerConfig::from_settings(&settings.scheduler)?;
    let template = MessageTemplate::from_settings(&settings.delivery)?;
    let transport = transport_from_settings(&settings.delivery)?;
    let storage = SqliteTaskStorage::connect(
        &settings.storage.database_url,
        settings.storage.max_connections,
    )
    .await
    .with_context(|| {
        format!(
            "failed to open task store [database_url = {}]",
            settings.storage.database_url
        )
    })?;

    let handle = DueTaskScheduler::new(
        config,
        Arc::new(storage),
        transport,
        settings.delivery.recipient.clone(),
    )
    .with_template(template)
    .start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    log::info!("Received ctrl-c, shutting down");

    let timeout = Duration::from_secs(settings.scheduler.shutdown_timeout_secs);
    handle.stop(timeout).await?;

    Ok(())
}

fn init_logging() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}
