//! Paginated notification feed and unread counter.
//!
//! Local state changes only after the booking service accepts the request.
//! List and count requests each carry a ticket; a response whose ticket is
//! no longer the latest for its query is dropped.

mod polling;
#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use booking_api::{BookingApiError, BookingService, Notification};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use polling::PollOutcome;

use crate::events::{self, EventSender, UiEvent};
use crate::lock;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl ReadFilter {
    fn as_query(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Unread => Some(false),
            Self::Read => Some(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { fetched: usize, added: usize },
    /// A newer list request started before this one returned.
    Superseded,
    /// Nothing left to load, or a load is already running.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: u64,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub loading: bool,
    pub read_filter: ReadFilter,
}

#[derive(Debug)]
struct FeedState {
    notifications: Vec<Notification>,
    unread_count: u64,
    /// Last page applied; 0 before the first fetch.
    page: u32,
    limit: u32,
    total: u64,
    loading: bool,
    read_filter: ReadFilter,
}

pub struct NotificationFeed {
    api: Arc<dyn BookingService>,
    events: EventSender,
    state: Mutex<FeedState>,
    list_ticket: AtomicU64,
    count_ticket: AtomicU64,
    polling: Mutex<Option<CancellationToken>>,
    poll_interval: Duration,
}

impl NotificationFeed {
    pub fn new(
        api: Arc<dyn BookingService>,
        events: EventSender,
        page_size: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            events,
            state: Mutex::new(FeedState {
                notifications: Vec::new(),
                unread_count: 0,
                page: 0,
                limit: page_size.max(1),
                total: 0,
                loading: false,
                read_filter: ReadFilter::All,
            }),
            list_ticket: AtomicU64::new(0),
            count_ticket: AtomicU64::new(0),
            polling: Mutex::new(None),
            poll_interval,
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = lock(&self.state);
        FeedSnapshot {
            notifications: state.notifications.clone(),
            unread_count: state.unread_count,
            page: state.page,
            limit: state.limit,
            total: state.total,
            loading: state.loading,
            read_filter: state.read_filter,
        }
    }

    pub fn unread_count(&self) -> u64 {
        lock(&self.state).unread_count
    }

    pub fn len(&self) -> usize {
        lock(&self.state).notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load page 1 (`reset`) or append the page after the last one loaded.
    ///
    /// Entries already in the feed are not added twice, and `total` never
    /// drops below the number of entries held.
    pub async fn fetch_notifications(&self, reset: bool) -> Result<FetchOutcome, BookingApiError> {
        let ticket = self.list_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let (page, limit, filter) = {
            let mut state = lock(&self.state);
            state.loading = true;
            let page = if reset { 1 } else { state.page + 1 };
            (page, state.limit, state.read_filter)
        };

        let result = self
            .api
            .list_notifications(page, limit, filter.as_query())
            .await;

        let mut state = lock(&self.state);
        if self.list_ticket.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, page, "Discarding superseded notification page");
            return Ok(FetchOutcome::Superseded);
        }
        state.loading = false;
        let response = result?;

        let fetched = response.items.len();
        if reset {
            state.notifications.clear();
        }
        let mut seen: HashSet<String> = state.notifications.iter().map(|n| n.id.clone()).collect();
        let mut added = 0;
        for item in response.items {
            if seen.insert(item.id.clone()) {
                state.notifications.push(item);
                added += 1;
            }
        }
        state.page = page;
        state.total = response.total.max(state.notifications.len() as u64);

        tracing::debug!(page, fetched, added, total = state.total, "Notification page applied");
        events::emit(
            &self.events,
            UiEvent::FeedUpdated {
                len: state.notifications.len(),
                total: state.total,
            },
        );
        Ok(FetchOutcome::Applied { fetched, added })
    }

    /// Append the next page when more entries exist remotely.
    pub async fn load_more(&self) -> Result<FetchOutcome, BookingApiError> {
        {
            let state = lock(&self.state);
            if state.loading || state.notifications.len() as u64 >= state.total {
                return Ok(FetchOutcome::Skipped);
            }
        }
        self.fetch_notifications(false).await
    }

    /// Change which entries the feed lists and reload from page 1.
    pub async fn set_read_filter(&self, filter: ReadFilter) -> Result<FetchOutcome, BookingApiError> {
        lock(&self.state).read_filter = filter;
        self.fetch_notifications(true).await
    }

    /// Refresh the unread counter. Returns `true` iff the count strictly
    /// increased since the previous observation.
    pub async fn get_unread_count(&self) -> Result<bool, BookingApiError> {
        let ticket = self.count_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let count = self.api.get_unread_notification_count().await?;

        let mut state = lock(&self.state);
        if self.count_ticket.load(Ordering::SeqCst) != ticket {
            tracing::debug!(ticket, "Discarding superseded unread count");
            return Ok(false);
        }
        let previous = state.unread_count;
        state.unread_count = count;
        drop(state);

        if count != previous {
            tracing::debug!(previous, count, "Unread count changed");
            events::emit(&self.events, UiEvent::UnreadCountChanged { count });
        }
        Ok(count > previous)
    }

    pub async fn mark_as_read(&self, id: &str) -> Result<(), BookingApiError> {
        self.api.mark_notification_read(id).await?;

        let mut state = lock(&self.state);
        self.invalidate_in_flight(&mut state);
        let was_unread = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .is_some_and(|n| !std::mem::replace(&mut n.is_read, true));
        if was_unread {
            state.unread_count = state.unread_count.saturating_sub(1);
            let count = state.unread_count;
            drop(state);
            events::emit(&self.events, UiEvent::UnreadCountChanged { count });
        }
        tracing::debug!(notification_id = %id, "Notification marked read");
        Ok(())
    }

    pub async fn mark_all_as_read(&self) -> Result<(), BookingApiError> {
        self.api.mark_all_notifications_read().await?;

        let mut state = lock(&self.state);
        self.invalidate_in_flight(&mut state);
        for notification in &mut state.notifications {
            notification.is_read = true;
        }
        state.unread_count = 0;
        drop(state);

        tracing::info!("All notifications marked read");
        events::emit(&self.events, UiEvent::UnreadCountChanged { count: 0 });
        Ok(())
    }

    /// Responses already on the way were read before a local mark and would
    /// bring back the old read state.
    fn invalidate_in_flight(&self, state: &mut FeedState) {
        self.list_ticket.fetch_add(1, Ordering::SeqCst);
        self.count_ticket.fetch_add(1, Ordering::SeqCst);
        state.loading = false;
    }

    /// Any unread new-booking entry currently held.
    pub fn has_unread_booking(&self) -> bool {
        lock(&self.state)
            .notifications
            .iter()
            .any(|n| !n.is_read && n.kind.is_new_booking())
    }
}
