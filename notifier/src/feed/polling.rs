//! Unread-count polling loop.

use std::sync::Arc;

use booking_api::BookingApiError;
use tokio_util::sync::CancellationToken;

use super::NotificationFeed;
use crate::background::sleep_or_cancel;
use crate::lock;
use crate::pending::{RefreshReason, RefreshTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Unread count did not increase; nothing else was fetched.
    Quiet,
    Refreshed { booking_signalled: bool },
}

impl NotificationFeed {
    /// One polling tick.
    ///
    /// Page 1 is refetched only when the unread count went up. If the fresh
    /// page holds an unread new-booking entry the pending queue is asked to
    /// refresh.
    pub async fn poll_once(&self, trigger: &RefreshTrigger) -> Result<PollOutcome, BookingApiError> {
        if !self.get_unread_count().await? {
            return Ok(PollOutcome::Quiet);
        }
        self.fetch_notifications(true).await?;

        let booking_signalled = self.has_unread_booking();
        if booking_signalled {
            trigger.request(RefreshReason::Poll);
        }
        Ok(PollOutcome::Refreshed { booking_signalled })
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.polling)
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    /// Start the polling loop under `parent`. Returns `false` if a loop is
    /// already running.
    pub fn start_polling(self: &Arc<Self>, trigger: RefreshTrigger, parent: &CancellationToken) -> bool {
        let mut slot = lock(&self.polling);
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            tracing::debug!("Notification polling already running");
            return false;
        }

        let token = parent.child_token();
        *slot = Some(token.clone());
        drop(slot);

        let feed = Arc::clone(self);
        let interval = self.poll_interval;
        tracing::info!(interval_secs = interval.as_secs(), "Notification polling started");

        tokio::spawn(async move {
            loop {
                if sleep_or_cancel(&token, interval).await {
                    break;
                }
                match feed.poll_once(&trigger).await {
                    Ok(PollOutcome::Quiet) => {}
                    Ok(PollOutcome::Refreshed { booking_signalled }) => {
                        tracing::debug!(booking_signalled, "Unread count increased; feed refreshed");
                    }
                    Err(e) => tracing::warn!(error = %e, "Notification poll failed"),
                }
            }
            tracing::info!("Notification polling stopped");
        });
        true
    }

    pub fn stop_polling(&self) {
        if let Some(token) = lock(&self.polling).take() {
            token.cancel();
        }
    }
}
