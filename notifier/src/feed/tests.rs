use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use booking_api::{Notification, NotificationKind};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::events::{self, UiEvent};
use crate::pending::{RefreshReason, refresh_channel};
use crate::test_support::{FakeBookingService, drain_events, notification};

const POLL: Duration = Duration::from_secs(30);

fn feed(api: &Arc<FakeBookingService>) -> (Arc<NotificationFeed>, broadcast::Receiver<UiEvent>) {
    let (tx, rx) = events::channel();
    let feed = NotificationFeed::new(api.clone(), tx, DEFAULT_PAGE_SIZE, POLL);
    (Arc::new(feed), rx)
}

fn system_notifications(count: usize) -> Vec<Notification> {
    (0..count)
        .map(|i| notification(&format!("n{i}"), NotificationKind::System, false))
        .collect()
}

fn assert_feed_invariants(feed: &NotificationFeed) {
    let snapshot = feed.snapshot();
    assert!(snapshot.notifications.len() as u64 <= snapshot.total);
    let ids: HashSet<&str> = snapshot.notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), snapshot.notifications.len(), "duplicate ids in feed");
}

#[tokio::test]
async fn pages_through_twenty_five_entries() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(25));
    let (feed, _rx) = feed(&api);

    assert_eq!(
        feed.fetch_notifications(true).await.unwrap(),
        FetchOutcome::Applied { fetched: 20, added: 20 }
    );
    assert_eq!(feed.snapshot().total, 25);

    assert_eq!(
        feed.load_more().await.unwrap(),
        FetchOutcome::Applied { fetched: 5, added: 5 }
    );
    assert_eq!(feed.len(), 25);

    assert_eq!(feed.load_more().await.unwrap(), FetchOutcome::Skipped);
    assert_eq!(api.read(|s| s.list_calls.clone()), vec![(1, 20, None), (2, 20, None)]);
    assert_feed_invariants(&feed);
}

#[tokio::test]
async fn load_more_before_first_fetch_is_a_no_op() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(3));
    let (feed, _rx) = feed(&api);

    assert_eq!(feed.load_more().await.unwrap(), FetchOutcome::Skipped);
    assert!(api.read(|s| s.list_calls.is_empty()));
}

#[tokio::test]
async fn shifted_pages_do_not_duplicate_entries() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(25));
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();

    // A new entry arrives at the head, pushing n19 onto page 2.
    api.update(|s| {
        s.notifications
            .insert(0, notification("fresh", NotificationKind::NewBooking, false));
    });

    assert_eq!(
        feed.fetch_notifications(false).await.unwrap(),
        FetchOutcome::Applied { fetched: 6, added: 5 }
    );
    assert_eq!(feed.len(), 25);
    assert_eq!(feed.snapshot().total, 26);
    assert_feed_invariants(&feed);
}

#[tokio::test]
async fn reset_replaces_the_feed() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(25));
    let (feed, mut rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    feed.load_more().await.unwrap();

    feed.fetch_notifications(true).await.unwrap();

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.notifications.len(), 20);
    assert_eq!(snapshot.page, 1);
    assert!(!snapshot.loading);
    let updates = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, UiEvent::FeedUpdated { .. }))
        .count();
    assert_eq!(updates, 3);
}

#[tokio::test]
async fn total_never_drops_below_held_entries() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(25));
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();

    // Entries removed remotely after page 1 was loaded.
    api.update(|s| s.notifications.truncate(21));
    feed.fetch_notifications(false).await.unwrap();

    assert_eq!(feed.len(), 21);
    assert_eq!(feed.snapshot().total, 21);
    assert_feed_invariants(&feed);
}

#[tokio::test]
async fn unread_count_reports_strict_increase() {
    let api = FakeBookingService::with(|s| s.unread = 3);
    let (feed, mut rx) = feed(&api);

    assert!(feed.get_unread_count().await.unwrap());
    assert!(!feed.get_unread_count().await.unwrap());

    api.update(|s| s.unread = 2);
    assert!(!feed.get_unread_count().await.unwrap());

    api.update(|s| s.unread = 5);
    assert!(feed.get_unread_count().await.unwrap());
    assert_eq!(feed.unread_count(), 5);

    let counts: Vec<u64> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            UiEvent::UnreadCountChanged { count } => Some(count),
            _ => None,
        })
        .collect();
    assert_eq!(counts, vec![3, 2, 5]);
}

#[tokio::test]
async fn mark_as_read_applies_after_remote_success() {
    let api = FakeBookingService::with(|s| {
        s.notifications = system_notifications(3);
        s.unread = 3;
    });
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    feed.get_unread_count().await.unwrap();

    feed.mark_as_read("n1").await.unwrap();
    let snapshot = feed.snapshot();
    assert!(snapshot.notifications[1].is_read);
    assert_eq!(snapshot.unread_count, 2);

    // Already read: no double decrement.
    feed.mark_as_read("n1").await.unwrap();
    assert_eq!(feed.unread_count(), 2);
    assert_eq!(api.read(|s| s.marked_read.clone()), vec!["n1", "n1"]);
}

#[tokio::test]
async fn page_in_flight_during_mark_as_read_is_dropped() {
    let api = FakeBookingService::with(|s| {
        s.notifications = system_notifications(3);
        s.unread = 3;
    });
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    feed.get_unread_count().await.unwrap();

    // Reads "n0" as unread, then stalls until released.
    let gate = api.gate_next_list();
    let slow = tokio::spawn({
        let feed = Arc::clone(&feed);
        async move { feed.fetch_notifications(true).await }
    });
    while api.read(|s| s.list_calls.len()) < 2 {
        tokio::task::yield_now().await;
    }

    feed.mark_as_read("n0").await.unwrap();
    gate.notify_one();

    assert_eq!(slow.await.unwrap().unwrap(), FetchOutcome::Superseded);
    let snapshot = feed.snapshot();
    assert!(snapshot.notifications[0].is_read);
    assert_eq!(snapshot.unread_count, 2);
    assert!(!snapshot.loading);
    assert_feed_invariants(&feed);
}

#[tokio::test]
async fn failed_mark_as_read_leaves_state_untouched() {
    let api = FakeBookingService::with(|s| {
        s.notifications = system_notifications(2);
        s.unread = 2;
    });
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    feed.get_unread_count().await.unwrap();

    api.update(|s| s.fail_mark_read = true);
    assert!(feed.mark_as_read("n0").await.is_err());

    let snapshot = feed.snapshot();
    assert!(!snapshot.notifications[0].is_read);
    assert_eq!(snapshot.unread_count, 2);
}

#[tokio::test]
async fn mark_all_as_read_clears_unread() {
    let api = FakeBookingService::with(|s| {
        s.notifications = system_notifications(4);
        s.unread = 4;
    });
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    feed.get_unread_count().await.unwrap();

    feed.mark_all_as_read().await.unwrap();

    let snapshot = feed.snapshot();
    assert!(snapshot.notifications.iter().all(|n| n.is_read));
    assert_eq!(snapshot.unread_count, 0);
    assert_eq!(api.read(|s| s.mark_all_calls), 1);
}

#[tokio::test]
async fn read_filter_reloads_matching_entries() {
    let api = FakeBookingService::with(|s| {
        s.notifications = vec![
            notification("a", NotificationKind::System, true),
            notification("b", NotificationKind::NewBooking, false),
            notification("c", NotificationKind::System, true),
        ];
    });
    let (feed, _rx) = feed(&api);

    feed.set_read_filter(ReadFilter::Unread).await.unwrap();

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.read_filter, ReadFilter::Unread);
    assert_eq!(snapshot.notifications.len(), 1);
    assert_eq!(snapshot.notifications[0].id, "b");
    assert_eq!(api.read(|s| s.list_calls.last().copied()), Some((1, 20, Some(false))));
}

#[tokio::test]
async fn unread_booking_detection_ignores_read_entries() {
    let api = FakeBookingService::with(|s| {
        s.notifications = vec![
            notification("a", NotificationKind::NewBooking, true),
            notification("b", NotificationKind::BookingReminder, false),
        ];
    });
    let (feed, _rx) = feed(&api);
    feed.fetch_notifications(true).await.unwrap();
    assert!(!feed.has_unread_booking());

    api.update(|s| {
        s.notifications
            .insert(0, notification("c", NotificationKind::NewBooking, false));
    });
    feed.fetch_notifications(true).await.unwrap();
    assert!(feed.has_unread_booking());
}

#[tokio::test]
async fn quiet_tick_makes_no_extra_calls() {
    let api = FakeBookingService::with(|s| s.notifications = system_notifications(3));
    let (feed, _rx) = feed(&api);
    let (trigger, mut refresh_rx) = refresh_channel();

    assert_eq!(feed.poll_once(&trigger).await.unwrap(), PollOutcome::Quiet);

    assert_eq!(api.read(|s| s.count_calls), 1);
    assert!(api.read(|s| s.list_calls.is_empty()));
    assert!(refresh_rx.try_recv().is_err());
}

#[tokio::test]
async fn increase_refetches_and_signals_pending_queue() {
    let api = FakeBookingService::with(|s| {
        s.notifications = vec![notification("b1", NotificationKind::NewBooking, false)];
        s.unread = 1;
    });
    let (feed, _rx) = feed(&api);
    let (trigger, mut refresh_rx) = refresh_channel();

    assert_eq!(
        feed.poll_once(&trigger).await.unwrap(),
        PollOutcome::Refreshed { booking_signalled: true }
    );
    assert_eq!(api.read(|s| s.list_calls.clone()), vec![(1, 20, None)]);
    assert_eq!(refresh_rx.try_recv().unwrap(), RefreshReason::Poll);
}

#[tokio::test]
async fn increase_without_booking_entries_does_not_signal() {
    let api = FakeBookingService::with(|s| {
        s.notifications = system_notifications(2);
        s.unread = 2;
    });
    let (feed, _rx) = feed(&api);
    let (trigger, mut refresh_rx) = refresh_channel();

    assert_eq!(
        feed.poll_once(&trigger).await.unwrap(),
        PollOutcome::Refreshed { booking_signalled: false }
    );
    assert!(refresh_rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn polling_loop_ticks_on_interval_until_stopped() {
    let api = FakeBookingService::new();
    let (feed, _rx) = feed(&api);
    let (trigger, mut refresh_rx) = refresh_channel();
    let shutdown = CancellationToken::new();

    assert!(feed.start_polling(trigger.clone(), &shutdown));
    assert!(!feed.start_polling(trigger, &shutdown));
    assert!(feed.is_polling());

    tokio::time::sleep(POLL / 2).await;
    assert_eq!(api.read(|s| s.count_calls), 0);

    tokio::time::sleep(POLL).await;
    assert_eq!(api.read(|s| s.count_calls), 1);
    assert!(api.read(|s| s.list_calls.is_empty()));

    api.update(|s| {
        s.notifications = vec![notification("b1", NotificationKind::NewBooking, false)];
        s.unread = 1;
    });
    tokio::time::sleep(POLL).await;
    assert_eq!(api.read(|s| s.count_calls), 2);
    assert_eq!(api.read(|s| s.list_calls.len()), 1);
    assert_eq!(refresh_rx.try_recv().unwrap(), RefreshReason::Poll);

    feed.stop_polling();
    assert!(!feed.is_polling());
    tokio::time::sleep(POLL * 3).await;
    assert_eq!(api.read(|s| s.count_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_token_stops_polling() {
    let api = FakeBookingService::new();
    let (feed, _rx) = feed(&api);
    let (trigger, _refresh_rx) = refresh_channel();
    let shutdown = CancellationToken::new();

    feed.start_polling(trigger.clone(), &shutdown);
    shutdown.cancel();
    tokio::time::sleep(POLL * 2).await;

    assert_eq!(api.read(|s| s.count_calls), 0);
    // A cancelled loop can be replaced by a fresh one.
    assert!(feed.start_polling(trigger, &CancellationToken::new()));
}
