//! Notification settings: remote source of truth with a local mirror.

use std::sync::atomic::Ordering;

use booking_api::NotificationTypeToggles;
use serde::{Deserialize, Serialize};

use super::platform::PermissionState;
use super::{PushChannelManager, PushError};
use crate::lock;

const CACHE_KEY: &str = "notification_settings";

/// `enabled` follows the platform permission (and an in-session opt-out);
/// only the per-type toggles are stored by the booking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub enabled: bool,
    #[serde(flatten)]
    pub types: NotificationTypeToggles,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub new_booking: Option<bool>,
    pub booking_status: Option<bool>,
    pub booking_reminder: Option<bool>,
    pub system: Option<bool>,
}

impl SettingsPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }
}

impl NotificationSettings {
    pub fn merged(self, patch: &SettingsPatch) -> Self {
        Self {
            enabled: patch.enabled.unwrap_or(self.enabled),
            types: NotificationTypeToggles {
                new_booking: patch.new_booking.unwrap_or(self.types.new_booking),
                booking_status: patch.booking_status.unwrap_or(self.types.booking_status),
                booking_reminder: patch.booking_reminder.unwrap_or(self.types.booking_reminder),
                system: patch.system.unwrap_or(self.types.system),
            },
        }
    }
}

impl PushChannelManager {
    pub fn settings(&self) -> NotificationSettings {
        *lock(&self.settings)
    }

    fn derived_enabled(&self) -> bool {
        self.is_supported()
            && self.platform.permission() == PermissionState::Granted
            && !self.opted_out.load(Ordering::SeqCst)
    }

    /// Fetch settings from the booking service, falling back to the local
    /// mirror and then to defaults. Never fails.
    pub async fn load_settings(&self) -> NotificationSettings {
        let types = match self.api.get_notification_settings().await {
            Ok(types) => types,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load notification settings, using local cache");
                self.cached_settings().map(|s| s.types).unwrap_or_default()
            }
        };

        let settings = NotificationSettings {
            enabled: self.derived_enabled(),
            types,
        };
        self.store_settings(settings);
        settings
    }

    /// Merge `patch`, persist the toggles remotely and mirror locally.
    ///
    /// Turning `enabled` off unregisters the push token; turning it on asks
    /// for permission if the operator was never prompted and re-runs
    /// [`PushChannelManager::initialize`]. If either step fails, `enabled`
    /// keeps its previous value so the same update can be retried.
    pub async fn update_settings(
        &self,
        patch: SettingsPatch,
    ) -> Result<NotificationSettings, PushError> {
        let previous = self.settings();
        let next = previous.merged(&patch);

        if next.types != previous.types {
            self.api.update_notification_settings(&next.types).await?;
        }

        let toggled = match (previous.enabled, next.enabled) {
            (true, false) => self.remove_token_from_server().await,
            (false, true)
                if self.is_supported() && self.platform.permission() == PermissionState::Default =>
            {
                self.request_permission().await.map(drop)
            }
            _ => Ok(()),
        };
        if let Err(e) = toggled {
            self.store_settings(NotificationSettings {
                enabled: previous.enabled,
                ..next
            });
            return Err(e);
        }
        self.store_settings(next);

        match (previous.enabled, next.enabled) {
            (true, false) => {
                self.opted_out.store(true, Ordering::SeqCst);
                tracing::info!("Push notifications disabled by operator");
            }
            (false, true) => {
                self.opted_out.store(false, Ordering::SeqCst);
                let ready = self.initialize().await;
                tracing::info!(ready, "Push notifications re-enabled by operator");
                if !ready {
                    let mut settings = lock(&self.settings);
                    settings.enabled = self.derived_enabled();
                }
            }
            _ => {}
        }

        Ok(self.settings())
    }

    fn store_settings(&self, settings: NotificationSettings) {
        *lock(&self.settings) = settings;
        match serde_json::to_string(&settings) {
            Ok(payload) => {
                if let Err(e) = self.db.save_cached_settings(CACHE_KEY, &payload) {
                    tracing::warn!(error = %e, "Failed to mirror notification settings");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to serialize notification settings"),
        }
    }

    fn cached_settings(&self) -> Option<NotificationSettings> {
        let payload = match self.db.load_cached_settings(CACHE_KEY) {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached notification settings");
                return None;
            }
        };
        serde_json::from_str(&payload)
            .map_err(|e| tracing::warn!(error = %e, "Discarding unreadable settings cache"))
            .ok()
    }
}
