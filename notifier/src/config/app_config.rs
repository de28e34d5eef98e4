//! Runtime application configuration loaded from DB + environment overrides.

use std::time::Duration;

use booking_api::DeviceType;

use super::defaults::get_default;
use super::manager::SettingsManager;

/// Runtime configuration populated from the settings DB.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub service_center_id: String,
    pub vapid_public_key: String,
    pub background_script_url: String,
    pub poll_interval_secs: u64,
    pub feed_page_size: u32,
    pub device_type: DeviceType,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_token: String::new(),
            service_center_id: String::new(),
            vapid_public_key: String::new(),
            background_script_url: "/push-worker.js".into(),
            poll_interval_secs: 30,
            feed_page_size: 20,
            device_type: DeviceType::Desktop,
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager (DB-first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default() };

        let mut poll_interval_secs =
            parse_or_default(&g("POLL_INTERVAL_SECS"), "POLL_INTERVAL_SECS", 30);
        if let Ok(v) = std::env::var("POLL_INTERVAL_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                poll_interval_secs = secs;
            }
        }

        let api_base_url = std::env::var("API_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| g("API_BASE_URL"));

        let background_script_url = match g("BACKGROUND_SCRIPT_URL") {
            url if url.is_empty() => "/push-worker.js".to_string(),
            url => url,
        };
        let feed_page_size = parse_or_default(&g("FEED_PAGE_SIZE"), "FEED_PAGE_SIZE", 20);

        Ok(Self {
            api_base_url,
            api_token: g("API_TOKEN"),
            service_center_id: g("SERVICE_CENTER_ID"),
            vapid_public_key: g("VAPID_PUBLIC_KEY"),
            background_script_url,
            poll_interval_secs: poll_interval_secs.max(5),
            feed_page_size: feed_page_size.clamp(1, 100),
            device_type: DeviceType::from_str_setting(&g("DEVICE_TYPE")),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_or_default<T: std::str::FromStr + Copy>(s: &str, key: &str, fallback: T) -> T {
    s.parse()
        .ok()
        .or_else(|| get_default(key).and_then(|d| d.parse().ok()))
        .unwrap_or(fallback)
}
