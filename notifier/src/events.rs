//! UI event types published by the notifier.
//!
//! The dashboard subscribes to these over a broadcast channel; nothing in
//! this crate renders them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub type EventSender = broadcast::Sender<UiEvent>;

pub fn channel() -> (EventSender, broadcast::Receiver<UiEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient, non-blocking message for the operator.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: Option<String>,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, body: Option<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body,
            raised_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    Notice(Notice),
    UnreadCountChanged {
        count: u64,
    },
    FeedUpdated {
        len: usize,
        total: u64,
    },
    PendingQueueChanged {
        len: usize,
        reviewing: bool,
        current: Option<String>,
    },
}

/// Publish an event; having no subscribers is not an error.
pub fn emit(tx: &EventSender, event: UiEvent) {
    if tx.send(event).is_err() {
        tracing::trace!("No UI subscribers for event");
    }
}

pub fn notice(tx: &EventSender, level: NoticeLevel, title: impl Into<String>, body: Option<String>) {
    emit(tx, UiEvent::Notice(Notice::new(level, title, body)));
}
