use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use booking_api::BookingApiClient;
use notifier_db::Database;

use crate::app::SharedState;
use crate::background;
use crate::config::{AppConfig, SettingsManager};
use crate::pending::PendingBookingQueue;
use crate::push::HeadlessPlatform;

/// Foundation init: .env, data dir, database, settings, config (fatal on error).
pub fn init_foundation() -> Result<(Database, AppConfig), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("local.db");
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());
    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate from env: {e}");
    }
    sm.initialize_defaults()?;

    let config = AppConfig::load(&sm)?;

    if let Ok(status) = sm.check_feature_status() {
        if !status.missing_settings.is_empty() || !status.warnings.is_empty() {
            tracing::warn!(
                "Missing settings: {:?}, warnings: {:?}",
                status.missing_settings,
                status.warnings
            );
        }
    }

    tracing::info!(
        poll_interval_secs = config.poll_interval_secs,
        service_center = %config.service_center_id,
        "Settings loaded"
    );
    Ok((db, config))
}

/// Build the composition root with the REST client and the headless platform.
pub fn build_state(db: Database, config: AppConfig) -> Result<SharedState, anyhow::Error> {
    let token = Some(config.api_token.clone()).filter(|t| !t.is_empty());
    let client = BookingApiClient::new(&config.api_base_url, token)
        .with_context(|| format!("invalid API_BASE_URL {:?}", config.api_base_url))?;
    let api = Arc::new(client);
    SharedState::new(db, config, api, Arc::new(HeadlessPlatform))
}

/// Spawn the refresh worker, polling loop, startup sync and push bring-up.
pub fn spawn_background_tasks(state: &SharedState) {
    let shutdown_token = state.shutdown_token();

    if let Some(rx) = state.take_refresh_receiver() {
        state
            .pending()
            .spawn_refresh_worker(rx, shutdown_token.child_token());
    }

    let subscription = state
        .push()
        .add_message_handler(PendingBookingQueue::push_handler(state.refresh_trigger()));
    state.set_push_subscription(subscription);

    let s = state.clone();
    tokio::spawn(async move { background::initial_sync(s).await });

    state
        .feed()
        .start_polling(state.refresh_trigger(), shutdown_token);

    let s = state.clone();
    tokio::spawn(async move { background::push_initialize(s).await });
}

/// Determine the data directory for the application.
/// Priority: BOOKING_NOTIFIER_DATA_DIR env var > ~/.booking-notifier
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BOOKING_NOTIFIER_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".booking-notifier")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
