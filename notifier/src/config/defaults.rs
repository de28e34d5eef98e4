//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

/// (key, default, secret, required, description)
type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

const DEFS: &[DefTuple] = &[
    ("API_BASE_URL", "", false, true, "Base URL of the booking service API"),
    ("API_TOKEN", "", true, true, "Bearer token for the booking service"),
    ("SERVICE_CENTER_ID", "", false, true, "Service center whose pending bookings are reviewed"),
    ("VAPID_PUBLIC_KEY", "", false, false, "Push server key; push stays disabled when empty"),
    ("BACKGROUND_SCRIPT_URL", "/push-worker.js", false, false, "Background script registered for push delivery"),
    ("POLL_INTERVAL_SECS", "30", false, false, "Unread count polling interval in seconds"),
    ("FEED_PAGE_SIZE", "20", false, false, "Notifications fetched per page"),
    ("DEVICE_TYPE", "desktop", false, false, "Device type reported when registering push tokens"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}
