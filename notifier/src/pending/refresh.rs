//! Refresh requests and reconciliation against the remote pending list.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use booking_api::BookingApiError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{PendingBookingQueue, QueueState};
use crate::lock;
use crate::push::PushMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Startup,
    Poll,
    Push,
    Manual,
}

impl RefreshReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Poll => "poll",
            Self::Push => "push",
            Self::Manual => "manual",
        }
    }
}

/// Sending half of the refresh channel.
///
/// The channel holds a single slot: a request made while another is still
/// queued is folded into it.
#[derive(Debug, Clone)]
pub struct RefreshTrigger {
    tx: mpsc::Sender<RefreshReason>,
}

impl RefreshTrigger {
    /// Returns `false` only when the refresh worker is gone.
    pub fn request(&self, reason: RefreshReason) -> bool {
        match self.tx.try_send(reason) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!(reason = reason.as_str(), "Refresh already queued");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(reason = reason.as_str(), "Refresh worker stopped; request dropped");
                false
            }
        }
    }
}

pub fn refresh_channel() -> (RefreshTrigger, mpsc::Receiver<RefreshReason>) {
    let (tx, rx) = mpsc::channel(1);
    (RefreshTrigger { tx }, rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Remote list matched the local queue.
    Unchanged,
    Updated {
        added: usize,
        removed: usize,
        opened: bool,
    },
    /// A newer refresh started before this one returned.
    Superseded,
    /// No service center configured.
    Skipped,
}

impl PendingBookingQueue {
    /// Fetch the remote pending list and reconcile the local queue with it.
    ///
    /// Entries gone remotely are dropped, new ones are appended in remote
    /// order and the booking under review stays under review. Appending to an
    /// idle queue opens the review.
    pub async fn refresh(&self) -> Result<RefreshOutcome, BookingApiError> {
        if self.service_center_id.trim().is_empty() {
            tracing::debug!("No service center configured; skipping pending refresh");
            return Ok(RefreshOutcome::Skipped);
        }

        let ticket = self.refresh_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let remote = self
            .api
            .list_pending_bookings(&self.service_center_id)
            .await?;

        let mut state = lock(&self.state);
        if self.refresh_ticket.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "Discarding superseded pending refresh");
            return Ok(RefreshOutcome::Superseded);
        }

        let outcome = reconcile(&mut state, remote);
        if let RefreshOutcome::Updated {
            added,
            removed,
            opened,
        } = outcome
        {
            tracing::info!(
                added,
                removed,
                opened,
                pending = state.queue.len(),
                "Pending bookings refreshed"
            );
            self.publish(&state);
        }
        Ok(outcome)
    }

    /// Serve refresh requests until `token` is cancelled or every trigger is
    /// dropped. Failed refreshes are logged; the next request retries.
    pub fn spawn_refresh_worker(
        self: &Arc<Self>,
        mut rx: mpsc::Receiver<RefreshReason>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let reason = tokio::select! {
                    _ = token.cancelled() => break,
                    reason = rx.recv() => match reason {
                        Some(reason) => reason,
                        None => break,
                    },
                };
                if let Err(e) = queue.refresh().await {
                    tracing::warn!(reason = reason.as_str(), error = %e, "Pending booking refresh failed");
                }
            }
            tracing::info!("Pending booking refresh worker stopped");
        })
    }

    /// Push handler requesting a refresh for every new-booking payload.
    pub fn push_handler(
        trigger: RefreshTrigger,
    ) -> impl Fn(&PushMessage) -> anyhow::Result<()> + Send + Sync + 'static {
        move |message| {
            if message.kind.is_new_booking() {
                tracing::debug!(booking_id = ?message.booking_id, "New booking pushed");
                trigger.request(RefreshReason::Push);
            }
            Ok(())
        }
    }
}

fn reconcile(state: &mut QueueState, remote: Vec<String>) -> RefreshOutcome {
    let remote_ids: HashSet<&str> = remote.iter().map(String::as_str).collect();
    state.dismissed.retain(|id| remote_ids.contains(id.as_str()));

    let current_id = state.current().cloned();
    let old_index = state.current_index;

    let before = state.queue.len();
    let mut kept_before_current = 0;
    let mut position = 0;
    state.queue.retain(|id| {
        let keep = remote_ids.contains(id.as_str());
        if keep && position < old_index {
            kept_before_current += 1;
        }
        position += 1;
        keep
    });
    let removed = before - state.queue.len();

    let mut added = 0;
    for id in remote {
        if state.dismissed.contains(&id) || state.queue.contains(&id) {
            continue;
        }
        state.queue.push(id);
        added += 1;
    }

    if added == 0 && removed == 0 {
        return RefreshOutcome::Unchanged;
    }

    let mut opened = false;
    if state.reviewing {
        // Stay on the same booking; if it was removed, the next one slides in.
        state.current_index = current_id
            .and_then(|id| state.queue.iter().position(|q| *q == id))
            .unwrap_or(kept_before_current);
        state.clamp_index();
    } else if added > 0 {
        state.current_index = 0;
        state.reviewing = true;
        opened = true;
    }

    RefreshOutcome::Updated {
        added,
        removed,
        opened,
    }
}
