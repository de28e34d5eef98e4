//! Sequential review of bookings awaiting operator confirmation.
//!
//! The queue is `Idle` until a review is opened, then `Reviewing` with a
//! valid `current_index`. Refreshes reconcile against the remote pending
//! list instead of replacing it, so an open review keeps its position.

mod refresh;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use booking_api::{BookingService, BookingStatus};
use serde::Serialize;

pub use refresh::{RefreshOutcome, RefreshReason, RefreshTrigger, refresh_channel};

use crate::events::{self, EventSender, NoticeLevel, UiEvent};
use crate::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPhase {
    Idle,
    Reviewing,
}

/// Result of a confirm/cancel attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Status updated and the entry removed from the queue.
    Applied,
    /// The booking service rejected the update; nothing changed.
    Failed,
    /// A decision for this booking is already in flight.
    InFlight,
    /// No booking is under review.
    NoCurrent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSnapshot {
    pub queue: Vec<String>,
    pub current_index: usize,
    pub phase: ReviewPhase,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub(crate) queue: Vec<String>,
    pub(crate) current_index: usize,
    pub(crate) reviewing: bool,
    pub(crate) in_flight: HashSet<String>,
    /// Bookings skipped past with `advance()`; not re-queued this session.
    pub(crate) dismissed: HashSet<String>,
}

impl QueueState {
    fn enter_idle(&mut self) {
        self.reviewing = false;
        self.current_index = 0;
    }

    fn clamp_index(&mut self) {
        if self.queue.is_empty() {
            self.enter_idle();
        } else if self.current_index >= self.queue.len() {
            self.current_index = self.queue.len() - 1;
        }
    }

    fn current(&self) -> Option<&String> {
        if !self.reviewing {
            return None;
        }
        self.queue.get(self.current_index)
    }
}

pub struct PendingBookingQueue {
    api: Arc<dyn BookingService>,
    events: EventSender,
    service_center_id: String,
    state: Mutex<QueueState>,
    refresh_ticket: AtomicU64,
}

impl PendingBookingQueue {
    pub fn new(api: Arc<dyn BookingService>, service_center_id: String, events: EventSender) -> Self {
        Self {
            api,
            events,
            service_center_id,
            state: Mutex::new(QueueState::default()),
            refresh_ticket: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        let state = lock(&self.state);
        PendingSnapshot {
            queue: state.queue.clone(),
            current_index: state.current_index,
            phase: if state.reviewing {
                ReviewPhase::Reviewing
            } else {
                ReviewPhase::Idle
            },
        }
    }

    pub fn phase(&self) -> ReviewPhase {
        self.snapshot().phase
    }

    pub fn len(&self) -> usize {
        lock(&self.state).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Booking under review, or `None` when idle.
    pub fn current_booking_uuid(&self) -> Option<String> {
        lock(&self.state).current().cloned()
    }

    pub fn is_in_flight(&self, booking_id: &str) -> bool {
        lock(&self.state).in_flight.contains(booking_id)
    }

    /// Start reviewing from the first entry. No-op on an empty queue.
    pub fn open_modal(&self) -> bool {
        let mut state = lock(&self.state);
        if state.queue.is_empty() {
            return false;
        }
        state.current_index = 0;
        state.reviewing = true;
        self.publish(&state);
        true
    }

    /// Move past the current entry without deciding it.
    ///
    /// Bounds come from the live queue length, so removals that landed while
    /// the entry was shown cannot make the index skip or repeat. Advancing
    /// past the last entry clears the queue and returns to `Idle`.
    pub fn advance(&self) -> ReviewPhase {
        let mut state = lock(&self.state);
        if !state.reviewing {
            return ReviewPhase::Idle;
        }

        if state.current_index + 1 < state.queue.len() {
            state.current_index += 1;
        } else {
            let skipped: Vec<String> = state.queue.drain(..).collect();
            state.dismissed.extend(skipped);
            state.enter_idle();
        }
        self.publish(&state);

        if state.reviewing {
            ReviewPhase::Reviewing
        } else {
            ReviewPhase::Idle
        }
    }

    pub async fn confirm(&self) -> DecisionOutcome {
        self.decide(BookingStatus::Confirmed).await
    }

    pub async fn cancel(&self) -> DecisionOutcome {
        self.decide(BookingStatus::Cancelled).await
    }

    async fn decide(&self, status: BookingStatus) -> DecisionOutcome {
        let booking_id = {
            let mut state = lock(&self.state);
            let Some(id) = state.current().cloned() else {
                return DecisionOutcome::NoCurrent;
            };
            if !state.in_flight.insert(id.clone()) {
                tracing::debug!(booking_id = %id, "Decision already in flight");
                return DecisionOutcome::InFlight;
            }
            id
        };

        let result = self.api.update_booking_status(&booking_id, status).await;

        let mut state = lock(&self.state);
        state.in_flight.remove(&booking_id);

        match result {
            Ok(()) => {
                // A refresh that read the remote list before this decision
                // landed would re-append the booking.
                self.refresh_ticket.fetch_add(1, Ordering::SeqCst);

                // Located by identity: the queue may have shifted while the
                // request was outstanding.
                if let Some(pos) = state.queue.iter().position(|id| *id == booking_id) {
                    state.queue.remove(pos);
                    if pos < state.current_index {
                        state.current_index -= 1;
                    }
                }
                state.clamp_index();
                tracing::info!(
                    booking_id = %booking_id,
                    status = status.as_str(),
                    remaining = state.queue.len(),
                    "Pending booking decided"
                );
                self.publish(&state);
                DecisionOutcome::Applied
            }
            Err(e) => {
                drop(state);
                tracing::warn!(
                    booking_id = %booking_id,
                    status = status.as_str(),
                    error = %e,
                    "Failed to update booking status"
                );
                events::notice(
                    &self.events,
                    NoticeLevel::Error,
                    "Could not update booking",
                    Some(e.to_string()),
                );
                DecisionOutcome::Failed
            }
        }
    }

    fn publish(&self, state: &QueueState) {
        events::emit(
            &self.events,
            UiEvent::PendingQueueChanged {
                len: state.queue.len(),
                reviewing: state.reviewing,
                current: state.current().cloned(),
            },
        );
    }
}
