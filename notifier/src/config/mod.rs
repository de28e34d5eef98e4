//! Configuration management: defaults, validation, loading from DB + environment.

pub mod app_config;
pub mod defaults;
pub mod manager;
pub mod validation;

pub use app_config::AppConfig;
pub use manager::SettingsManager;

use serde::{Deserialize, Serialize};

/// Feature availability status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureStatus {
    pub api_configured: bool,
    pub push_configured: bool,
    pub missing_settings: Vec<String>,
    pub warnings: Vec<String>,
}
