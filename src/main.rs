use std::sync::Arc;

use anyhow::{Context, Result};
use dashpanel_core::{AppError, Config, ConfigError, JsonFileStore};
use dashpanel_services::{Dashboard, LogSink, Scheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    dashpanel_core::init()?;

    let (config, _validation) =
        Config::load_validated().map_err(|e| match e.downcast::<ConfigError>() {
            Ok(config_err) => user_facing(config_err.into()),
            Err(e) => e,
        })?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let store = JsonFileStore::open(config.state_path())
        .with_context(|| format!("Failed to open {}", config.state_path().display()))?;

    let dashboard = Arc::new(
        Dashboard::new(config, Arc::new(store), Arc::new(LogSink))
            .map_err(user_facing)?,
    );

    let mut scheduler = Scheduler::new();
    dashboard.start(&mut scheduler);
    tracing::info!("dashpanel started; press Ctrl+C to exit");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    // Graceful shutdown
    tracing::info!("Shutting down");
    scheduler.stop_all();

    Ok(())
}

fn user_facing(err: AppError) -> anyhow::Error {
    anyhow::anyhow!("{} ({})", err.user_message(), err)
}
