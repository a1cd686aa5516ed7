// Reminder daemon entry point

use anyhow::{Context, Result};
use common::catalog::{MedicineCatalog, StaticCatalog};
use common::clock::{SystemClock, WallClockZone};
use common::config::Settings;
use common::scheduler::{notifier_callback, LogAlertNotifier, ReminderConfig, ReminderEngine};
use common::storage::{FileStore, KeyValueStore};
use common::telemetry;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    telemetry::init_logging(
        &settings.observability.log_level,
        settings.observability.json_logs,
    )?;
    info!("Starting MediSense reminder scheduler");

    if let Some(port) = settings.observability.metrics_port {
        telemetry::init_metrics(port)?;
    }

    let store = Arc::new(FileStore::new(&settings.storage.data_dir)) as Arc<dyn KeyValueStore>;
    info!(data_dir = %settings.storage.data_dir.display(), "File store initialized");

    let catalog: Arc<dyn MedicineCatalog> = match &settings.catalog.path {
        Some(path) => Arc::new(
            StaticCatalog::from_json_file(path).context("Failed to load medicine catalog")?,
        ),
        None => {
            info!("No catalog path configured, using demo medicines");
            Arc::new(StaticCatalog::demo())
        }
    };

    let zone = WallClockZone::from_setting(settings.reminder.timezone.as_deref())
        .map_err(anyhow::Error::msg)?;

    let engine = Arc::new(ReminderEngine::new(
        ReminderConfig::from(&settings.reminder),
        store,
        catalog,
        Arc::new(SystemClock),
        zone,
    ));
    engine.initialize().await;
    engine.subscribe(notifier_callback(Arc::new(LogAlertNotifier)));

    for upcoming in engine.upcoming_medications() {
        info!(
            medicine_name = %upcoming.medicine_name,
            dosage = %upcoming.dosage,
            time = %upcoming.time,
            "Upcoming today"
        );
    }

    let engine_for_shutdown = engine.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C signal, initiating graceful shutdown");
        engine_for_shutdown.shutdown();
    });

    engine.run().await;

    info!("Reminder scheduler stopped");
    Ok(())
}
