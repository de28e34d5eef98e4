//! Headless notifier: polls the booking service and logs UI events.
//!
//! Runs without a push platform, so new bookings arrive through polling.

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use booking_notifier_lib::events::{NoticeLevel, UiEvent};
use booking_notifier_lib::shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting booking notifier (headless mode)");

    let (db, config) = booking_notifier_lib::init_foundation()?;
    let state = booking_notifier_lib::build_state(db, config)?;

    let mut events = state.subscribe_events();
    let token = state.shutdown_token().clone();
    let logger = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "UI event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    booking_notifier_lib::spawn_background_tasks(&state);
    tracing::info!("Headless notifier running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    shutdown::graceful_shutdown(&state).await;
    logger.abort();
    Ok(())
}

fn log_event(event: &UiEvent) {
    match event {
        UiEvent::Notice(notice) => match notice.level {
            NoticeLevel::Info => tracing::info!(body = ?notice.body, "{}", notice.title),
            NoticeLevel::Warning => tracing::warn!(body = ?notice.body, "{}", notice.title),
            NoticeLevel::Error => tracing::error!(body = ?notice.body, "{}", notice.title),
        },
        UiEvent::UnreadCountChanged { count } => tracing::info!(count, "Unread notifications"),
        UiEvent::FeedUpdated { len, total } => tracing::debug!(len, total, "Feed updated"),
        UiEvent::PendingQueueChanged {
            len,
            reviewing,
            current,
        } => tracing::info!(len, reviewing, current = ?current, "Pending bookings"),
    }
}
