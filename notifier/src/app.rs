use std::sync::{Arc, Mutex};

use booking_api::BookingService;
use notifier_db::Database;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::device::DeviceIdentity;
use crate::events::{self, EventSender, UiEvent};
use crate::feed::NotificationFeed;
use crate::lock;
use crate::pending::{PendingBookingQueue, RefreshReason, RefreshTrigger, refresh_channel};
use crate::push::{PushChannelManager, PushConfig, PushPlatform, Subscription};

/// Composition root shared by the binary and background tasks.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    events: EventSender,
    push: Arc<PushChannelManager>,
    feed: Arc<NotificationFeed>,
    pending: Arc<PendingBookingQueue>,
    refresh_trigger: RefreshTrigger,
    /// Taken once by the refresh worker.
    refresh_rx: Mutex<Option<mpsc::Receiver<RefreshReason>>>,
    push_subscription: Mutex<Option<Subscription>>,
    shutdown_token: CancellationToken,
}

impl SharedState {
    pub fn new(
        db: Database,
        config: AppConfig,
        api: Arc<dyn BookingService>,
        platform: Arc<dyn PushPlatform>,
    ) -> Result<Self, anyhow::Error> {
        let (events, _) = events::channel();
        let shutdown_token = CancellationToken::new();

        let device = DeviceIdentity::load_or_create(&db, config.device_type)?;
        tracing::info!(
            device_id = %device.device_id,
            device_name = %device.device_name,
            "Device identity loaded"
        );

        let push = Arc::new(PushChannelManager::new(
            platform,
            Arc::clone(&api),
            db,
            device,
            PushConfig::from(&config),
            events.clone(),
            shutdown_token.clone(),
        ));
        let feed = Arc::new(NotificationFeed::new(
            Arc::clone(&api),
            events.clone(),
            config.feed_page_size,
            config.poll_interval(),
        ));
        let pending = Arc::new(PendingBookingQueue::new(
            api,
            config.service_center_id.clone(),
            events.clone(),
        ));
        let (refresh_trigger, refresh_rx) = refresh_channel();

        Ok(Self {
            inner: Arc::new(SharedStateInner {
                events,
                push,
                feed,
                pending,
                refresh_trigger,
                refresh_rx: Mutex::new(Some(refresh_rx)),
                push_subscription: Mutex::new(None),
                shutdown_token,
            }),
        })
    }

    pub fn push(&self) -> &Arc<PushChannelManager> {
        &self.inner.push
    }

    pub fn feed(&self) -> &Arc<NotificationFeed> {
        &self.inner.feed
    }

    pub fn pending(&self) -> &Arc<PendingBookingQueue> {
        &self.inner.pending
    }

    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.inner.refresh_trigger.clone()
    }

    pub(crate) fn take_refresh_receiver(&self) -> Option<mpsc::Receiver<RefreshReason>> {
        lock(&self.inner.refresh_rx).take()
    }

    pub(crate) fn set_push_subscription(&self, subscription: Subscription) {
        *lock(&self.inner.push_subscription) = Some(subscription);
    }

    pub(crate) fn take_push_subscription(&self) -> Option<Subscription> {
        lock(&self.inner.push_subscription).take()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UiEvent> {
        self.inner.events.subscribe()
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown_token
    }
}
