//! In-memory fakes for the booking service and push platform.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use booking_api::{
    BookingApiError, BookingService, BookingStatus, DeviceRegistrationRequest, DeviceType,
    Notification, NotificationKind, NotificationPage, NotificationTypeToggles,
};
use chrono::{TimeZone, Utc};
use notifier_db::Database;
use tokio::sync::{Notify, broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::device::DeviceIdentity;
use crate::events::{self, UiEvent};
use crate::lock;
use crate::push::{
    PermissionState, PlatformCapabilities, PlatformError, PushChannelManager, PushConfig,
    PushPlatform, RegistrationHandle, WorkerState,
};

pub(crate) fn notification(id: &str, kind: NotificationKind, is_read: bool) -> Notification {
    Notification {
        id: id.to_string(),
        title: format!("Notification {id}"),
        subtitle: None,
        body: String::new(),
        created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
        is_read,
        kind,
        data: None,
    }
}

fn server_error() -> BookingApiError {
    BookingApiError::ApiError {
        status: 500,
        message: "unavailable".into(),
    }
}

#[derive(Default)]
pub(crate) struct FakeState {
    /// Full remote feed, newest first.
    pub notifications: Vec<Notification>,
    pub unread: u64,
    pub pending: Vec<String>,
    pub settings: NotificationTypeToggles,

    pub fail_settings: bool,
    pub fail_status: bool,
    pub fail_mark_read: bool,
    pub fail_unregister: bool,

    pub list_calls: Vec<(u32, u32, Option<bool>)>,
    pub count_calls: usize,
    pub pending_calls: usize,
    pub registered: Vec<DeviceRegistrationRequest>,
    pub unregistered: Vec<String>,
    pub settings_updates: Vec<NotificationTypeToggles>,
    pub status_updates: Vec<(String, BookingStatus)>,
    pub marked_read: Vec<String>,
    pub mark_all_calls: usize,
}

/// Booking service backed by [`FakeState`].
///
/// A gate installed with one of the `gate_next_*` methods holds the next
/// matching call until the returned [`Notify`] is signalled.
#[derive(Default)]
pub(crate) struct FakeBookingService {
    pub state: Mutex<FakeState>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    pending_gate: Mutex<Option<Arc<Notify>>>,
    status_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeBookingService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(f: impl FnOnce(&mut FakeState)) -> Arc<Self> {
        let fake = Self::default();
        f(&mut lock(&fake.state));
        Arc::new(fake)
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut lock(&self.state));
    }

    pub fn read<R>(&self, f: impl FnOnce(&FakeState) -> R) -> R {
        f(&lock(&self.state))
    }

    pub fn gate_next_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.list_gate) = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_next_pending(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.pending_gate) = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_next_status(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.status_gate) = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl BookingService for FakeBookingService {
    async fn register_device_token(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<(), BookingApiError> {
        lock(&self.state).registered.push(request.clone());
        Ok(())
    }

    async fn unregister_device_token(&self, device_id: &str) -> Result<(), BookingApiError> {
        let mut state = lock(&self.state);
        if state.fail_unregister {
            return Err(server_error());
        }
        state.unregistered.push(device_id.to_string());
        Ok(())
    }

    async fn get_notification_settings(&self) -> Result<NotificationTypeToggles, BookingApiError> {
        let state = lock(&self.state);
        if state.fail_settings {
            return Err(server_error());
        }
        Ok(state.settings)
    }

    async fn update_notification_settings(
        &self,
        toggles: &NotificationTypeToggles,
    ) -> Result<(), BookingApiError> {
        let mut state = lock(&self.state);
        if state.fail_settings {
            return Err(server_error());
        }
        state.settings = *toggles;
        state.settings_updates.push(*toggles);
        Ok(())
    }

    async fn list_notifications(
        &self,
        page: u32,
        limit: u32,
        is_read: Option<bool>,
    ) -> Result<NotificationPage, BookingApiError> {
        let (result, gate) = {
            let mut state = lock(&self.state);
            state.list_calls.push((page, limit, is_read));
            let matching: Vec<&Notification> = state
                .notifications
                .iter()
                .filter(|n| is_read.is_none_or(|r| n.is_read == r))
                .collect();
            let start = (page.saturating_sub(1) * limit) as usize;
            let items = matching
                .iter()
                .skip(start)
                .take(limit as usize)
                .map(|n| (*n).clone())
                .collect();
            let result = NotificationPage {
                items,
                total: matching.len() as u64,
            };
            (result, lock(&self.list_gate).take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(result)
    }

    async fn get_unread_notification_count(&self) -> Result<u64, BookingApiError> {
        let mut state = lock(&self.state);
        state.count_calls += 1;
        Ok(state.unread)
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), BookingApiError> {
        let mut state = lock(&self.state);
        if state.fail_mark_read {
            return Err(server_error());
        }
        state.marked_read.push(id.to_string());
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), BookingApiError> {
        lock(&self.state).mark_all_calls += 1;
        Ok(())
    }

    async fn list_pending_bookings(
        &self,
        _service_center_id: &str,
    ) -> Result<Vec<String>, BookingApiError> {
        let (pending, gate) = {
            let mut state = lock(&self.state);
            state.pending_calls += 1;
            (state.pending.clone(), lock(&self.pending_gate).take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(pending)
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), BookingApiError> {
        let gate = lock(&self.status_gate).take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let mut state = lock(&self.state);
        if state.fail_status {
            return Err(server_error());
        }
        state
            .status_updates
            .push((booking_id.to_string(), status));
        state.pending.retain(|id| id != booking_id);
        Ok(())
    }
}

/// Push platform whose permission, worker lifecycle and token are scripted
/// by the test.
pub(crate) struct FakePlatform {
    pub caps: PlatformCapabilities,
    pub permission: Mutex<PermissionState>,
    /// Answer given when the prompt is shown.
    pub prompt_answer: Mutex<PermissionState>,
    /// State new registrations start in.
    pub initial_worker_state: Mutex<WorkerState>,
    pub existing: Mutex<Option<RegistrationHandle>>,
    pub token: Mutex<Option<String>>,
    worker_tx: Mutex<Option<watch::Sender<WorkerState>>>,
    pub register_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub prompt_calls: AtomicUsize,
    pub foreground: broadcast::Sender<serde_json::Value>,
}

impl FakePlatform {
    pub fn new(permission: PermissionState) -> Arc<Self> {
        let (foreground, _) = broadcast::channel(16);
        Arc::new(Self {
            caps: PlatformCapabilities {
                push_api: true,
                notification_api: true,
            },
            permission: Mutex::new(permission),
            prompt_answer: Mutex::new(PermissionState::Granted),
            initial_worker_state: Mutex::new(WorkerState::Activated),
            existing: Mutex::new(None),
            token: Mutex::new(Some("push-token-1".into())),
            worker_tx: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            prompt_calls: AtomicUsize::new(0),
            foreground,
        })
    }

    pub fn set_permission(&self, permission: PermissionState) {
        *lock(&self.permission) = permission;
    }

    pub fn start_worker_in(&self, state: WorkerState) {
        *lock(&self.initial_worker_state) = state;
    }

    /// Move the most recent registration's worker to `state`.
    pub fn set_worker_state(&self, state: WorkerState) {
        if let Some(tx) = lock(&self.worker_tx).as_ref() {
            tx.send_replace(state);
        }
    }

    pub fn registers(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        self.caps
    }

    fn permission(&self) -> PermissionState {
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> Result<PermissionState, PlatformError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        let answer = *lock(&self.prompt_answer);
        *lock(&self.permission) = answer;
        Ok(answer)
    }

    async fn find_registration(
        &self,
        _script_url: &str,
    ) -> Result<Option<RegistrationHandle>, PlatformError> {
        Ok(lock(&self.existing).clone())
    }

    async fn register(&self, script_url: &str) -> Result<RegistrationHandle, PlatformError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = watch::channel(*lock(&self.initial_worker_state));
        *lock(&self.worker_tx) = Some(tx);
        Ok(RegistrationHandle {
            scope: script_url.to_string(),
            state: rx,
        })
    }

    async fn subscribe(
        &self,
        _registration: &RegistrationHandle,
        _server_key: &str,
    ) -> Result<Option<String>, PlatformError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.token).clone())
    }

    fn foreground_messages(&self) -> Option<broadcast::Receiver<serde_json::Value>> {
        Some(self.foreground.subscribe())
    }
}

/// An already-activated registration, as left behind by an earlier run.
pub(crate) fn activated_registration(scope: &str) -> RegistrationHandle {
    let (tx, rx) = watch::channel(WorkerState::Activated);
    // Receivers keep the last value after the sender is gone.
    drop(tx);
    RegistrationHandle {
        scope: scope.to_string(),
        state: rx,
    }
}

pub(crate) struct PushFixture {
    pub manager: PushChannelManager,
    pub platform: Arc<FakePlatform>,
    pub api: Arc<FakeBookingService>,
    pub db: Database,
    pub events: broadcast::Receiver<UiEvent>,
}

pub(crate) fn push_fixture(
    platform: Arc<FakePlatform>,
    api: Arc<FakeBookingService>,
    vapid_public_key: &str,
) -> PushFixture {
    let db = Database::open_in_memory().unwrap();
    let device = DeviceIdentity::load_or_create(&db, DeviceType::Web).unwrap();
    let (tx, events) = events::channel();
    let manager = PushChannelManager::new(
        platform.clone(),
        api.clone(),
        db.clone(),
        device,
        PushConfig {
            vapid_public_key: vapid_public_key.to_string(),
            background_script_url: "/push-worker.js".to_string(),
        },
        tx,
        CancellationToken::new(),
    );
    PushFixture {
        manager,
        platform,
        api,
        db,
        events,
    }
}

/// Drain every event currently buffered on `rx`.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
