use std::time::Duration;

use tokio::time::sleep;

use crate::app::SharedState;

pub async fn graceful_shutdown(state: &SharedState) {
    tracing::info!("Shutdown sequence started");

    state.feed().stop_polling();
    tracing::info!("Shutdown: notification polling stopped");

    if let Some(subscription) = state.take_push_subscription() {
        subscription.unsubscribe();
    }
    state.push().detach_foreground_dispatcher();
    tracing::info!("Shutdown: push dispatcher detached");

    state.shutdown_token().cancel();
    tracing::info!("Shutdown: background loops cancelled");

    sleep(Duration::from_millis(200)).await;
    tracing::info!("Shutdown sequence completed");
}
