//! Push channel: permission negotiation, background registration, token
//! lifecycle, settings sync and foreground message fan-out.
//!
//! Every entry point tolerates an unsupported platform by doing nothing.
//! Errors from the platform or the booking service propagate to the caller,
//! except from [`PushChannelManager::initialize`], which logs them and
//! reports `false`.

mod handlers;
mod payload;
mod platform;
mod registration;
mod settings;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use booking_api::{BookingApiError, BookingService, DeviceRegistrationRequest};
use notifier_db::Database;
use tokio::sync::{Mutex as AsyncMutex, broadcast, watch};
use tokio_util::sync::CancellationToken;

pub use handlers::{HandlerId, HandlerRegistry, MessageHandler, Subscription};
pub use payload::PushMessage;
pub use platform::{
    HeadlessPlatform, PermissionState, PlatformCapabilities, PlatformError, PushPlatform,
    RegistrationHandle, WorkerState,
};
pub use registration::{ACTIVATION_TIMEOUT, BackgroundRegistrationState, FailureReason};
pub use settings::{NotificationSettings, SettingsPatch};

use crate::config::AppConfig;
use crate::device::DeviceIdentity;
use crate::events::{self, EventSender, NoticeLevel};
use crate::lock;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push notifications are not supported on this platform")]
    Unsupported,

    #[error("background script did not activate within {0:?}")]
    RegistrationTimeout(Duration),

    #[error("background script registration became redundant")]
    RegistrationRedundant,

    #[error("push platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Api(#[from] BookingApiError),
}

/// Push-related settings taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub vapid_public_key: String,
    pub background_script_url: String,
}

impl From<&AppConfig> for PushConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            vapid_public_key: config.vapid_public_key.clone(),
            background_script_url: config.background_script_url.clone(),
        }
    }
}

pub struct PushChannelManager {
    platform: Arc<dyn PushPlatform>,
    api: Arc<dyn BookingService>,
    db: Database,
    device: DeviceIdentity,
    config: PushConfig,
    registration_lock: AsyncMutex<()>,
    registration_state: watch::Sender<BackgroundRegistrationState>,
    active_registration: Mutex<Option<RegistrationHandle>>,
    /// Provider token; never persisted.
    current_token: Mutex<Option<String>>,
    settings: Mutex<NotificationSettings>,
    opted_out: AtomicBool,
    denied_notice_sent: AtomicBool,
    handlers: HandlerRegistry,
    events: EventSender,
    dispatcher: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl PushChannelManager {
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        api: Arc<dyn BookingService>,
        db: Database,
        device: DeviceIdentity,
        config: PushConfig,
        events: EventSender,
        shutdown: CancellationToken,
    ) -> Self {
        let (registration_state, _) = watch::channel(BackgroundRegistrationState::Unregistered);
        Self {
            platform,
            api,
            db,
            device,
            config,
            registration_lock: AsyncMutex::new(()),
            registration_state,
            active_registration: Mutex::new(None),
            current_token: Mutex::new(None),
            settings: Mutex::new(NotificationSettings::default()),
            opted_out: AtomicBool::new(false),
            denied_notice_sent: AtomicBool::new(false),
            handlers: HandlerRegistry::default(),
            events,
            dispatcher: Mutex::new(None),
            shutdown,
        }
    }

    /// Push API, notification API and a server key must all be present.
    pub fn is_supported(&self) -> bool {
        let caps = self.platform.capabilities();
        caps.push_api && caps.notification_api && !self.config.vapid_public_key.trim().is_empty()
    }

    pub fn permission(&self) -> PermissionState {
        if !self.is_supported() {
            return PermissionState::Denied;
        }
        self.platform.permission()
    }

    /// Show the platform permission prompt.
    pub async fn request_permission(&self) -> Result<PermissionState, PushError> {
        if !self.is_supported() {
            return Ok(PermissionState::Denied);
        }
        let state = self.platform.request_permission().await?;
        tracing::info!(permission = ?state, "Notification permission requested");
        if state == PermissionState::Denied {
            self.warn_permission_denied_once();
        }
        Ok(state)
    }

    pub fn current_token(&self) -> Option<String> {
        lock(&self.current_token).clone()
    }

    /// Acquire the push token.
    ///
    /// Returns `Ok(None)` when the platform is unsupported, permission is not
    /// granted, or no activated registration exists yet.
    pub async fn get_token(&self) -> Result<Option<String>, PushError> {
        if !self.is_supported() {
            return Ok(None);
        }
        if self.platform.permission() != PermissionState::Granted {
            return Ok(None);
        }
        let Some(registration) = self.active_registration() else {
            tracing::debug!("No active background registration; token unavailable");
            return Ok(None);
        };

        let token = self
            .platform
            .subscribe(&registration, &self.config.vapid_public_key)
            .await?;

        let mut current = lock(&self.current_token);
        if current.is_some() && *current != token {
            tracing::info!("Push token rotated");
        }
        *current = token.clone();
        Ok(token)
    }

    pub async fn send_token_to_server(&self, token: &str) -> Result<(), PushError> {
        let request = DeviceRegistrationRequest {
            device_id: self.device.device_id.clone(),
            device_type: self.device.device_type,
            device_name: self.device.device_name.clone(),
            token: token.to_string(),
        };
        self.api.register_device_token(&request).await?;
        Ok(())
    }

    pub async fn remove_token_from_server(&self) -> Result<(), PushError> {
        if !self.is_supported() {
            return Ok(());
        }
        self.api
            .unregister_device_token(&self.device.device_id)
            .await?;
        *lock(&self.current_token) = None;
        Ok(())
    }

    /// Bring the push channel up as far as current permission allows.
    ///
    /// Returns `true` once a token is registered with the booking service and
    /// the foreground dispatcher is attached. Never prompts for permission.
    pub async fn initialize(&self) -> bool {
        if !self.is_supported() {
            tracing::debug!("Push channel unsupported; relying on polling");
            return false;
        }
        match self.try_initialize().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::error!(error = %e, "Push channel initialization failed");
                false
            }
        }
    }

    async fn try_initialize(&self) -> Result<bool, PushError> {
        // Registered before any permission check so the channel is ready as
        // soon as the operator opts in.
        self.register_background_script().await?;

        let settings = self.load_settings().await;

        match self.platform.permission() {
            PermissionState::Denied => {
                self.warn_permission_denied_once();
                return Ok(false);
            }
            PermissionState::Default => {
                tracing::info!("Notification permission not granted yet; waiting for opt-in");
                return Ok(false);
            }
            PermissionState::Granted => {}
        }
        if !settings.enabled {
            tracing::info!("Push notifications disabled in settings");
            return Ok(false);
        }

        let Some(token) = self.get_token().await? else {
            tracing::warn!("Push provider returned no token");
            return Ok(false);
        };
        self.send_token_to_server(&token).await?;
        self.attach_foreground_dispatcher();

        tracing::info!(device_id = %self.device.device_id, "Push channel ready");
        Ok(true)
    }

    fn warn_permission_denied_once(&self) {
        if self.denied_notice_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::warn!("Notification permission denied; push channel inactive");
        events::notice(
            &self.events,
            NoticeLevel::Warning,
            "Notifications are blocked",
            Some("Allow notifications for this site to receive booking alerts.".into()),
        );
    }

    pub fn add_message_handler<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&PushMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.add(handler)
    }

    pub fn remove_message_handler(&self, id: HandlerId) -> bool {
        self.handlers.remove(id)
    }

    /// Normalize a raw payload and fan it out to every handler.
    pub fn dispatch(&self, raw: &serde_json::Value) {
        dispatch_to(&self.handlers, &self.events, raw);
    }

    /// Start forwarding foreground messages. Idempotent.
    fn attach_foreground_dispatcher(&self) {
        let mut slot = lock(&self.dispatcher);
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }
        let Some(mut rx) = self.platform.foreground_messages() else {
            tracing::debug!("Platform has no foreground message stream");
            return;
        };

        let token = self.shutdown.child_token();
        *slot = Some(token.clone());
        let handlers = self.handlers.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(raw) => dispatch_to(&handlers, &events, &raw),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Foreground dispatcher lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::info!("Foreground push dispatcher stopped");
        });
    }

    pub fn detach_foreground_dispatcher(&self) {
        if let Some(token) = lock(&self.dispatcher).take() {
            token.cancel();
        }
    }
}

/// New-booking payloads get no transient notice: the pending booking review
/// already prompts the operator for them.
fn dispatch_to(handlers: &HandlerRegistry, events: &EventSender, raw: &serde_json::Value) {
    let message = PushMessage::from_value(raw);
    let delivered = handlers.dispatch(&message);
    tracing::debug!(kind = message.kind.as_str(), delivered, "Foreground push dispatched");

    if message.kind.is_new_booking() {
        return;
    }
    let title = message
        .title
        .clone()
        .unwrap_or_else(|| "New notification".to_string());
    events::notice(events, NoticeLevel::Info, title, message.body.clone());
}
