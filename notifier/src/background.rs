//! Background tasks: startup sync and push channel bring-up.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::app::SharedState;
use crate::pending::RefreshReason;

/// Sleep for `duration`; returns `true` if `token` was cancelled first.
pub(crate) async fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

/// Load the first feed page and unread count, then ask for a pending refresh.
///
/// Failures are logged; the polling loop catches up on its next tick.
pub async fn initial_sync(state: SharedState) {
    let shutdown_token = state.shutdown_token().clone();
    if shutdown_token.is_cancelled() {
        return;
    }

    let feed = state.feed();
    if let Err(e) = feed.get_unread_count().await {
        tracing::warn!(error = %e, "Initial unread count failed");
    }
    match feed.fetch_notifications(true).await {
        Ok(outcome) => tracing::debug!(?outcome, "Initial notification page loaded"),
        Err(e) => tracing::warn!(error = %e, "Initial notification fetch failed"),
    }

    state.refresh_trigger().request(RefreshReason::Startup);
    tracing::info!(unread = feed.unread_count(), "Initial sync finished");
}

/// Bring the push channel up. A `false` result leaves the notifier on
/// polling alone.
pub async fn push_initialize(state: SharedState) {
    let ready = state.push().initialize().await;
    if ready {
        tracing::info!("Push channel active");
    } else {
        tracing::info!(
            permission = ?state.push().permission(),
            "Push channel inactive; polling only"
        );
    }
}
