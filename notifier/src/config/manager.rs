//! SettingsManager: DB-backed settings with defaults, migration, and feature status.

use notifier_db::Database;

use super::FeatureStatus;
use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;

/// Wraps [`Database`] to provide high-level settings operations.
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a setting value. Falls back to default if not in DB.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.db.get_setting(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Initialize default settings in DB (skip existing).
    pub fn initialize_defaults(&self) -> Result<(), anyhow::Error> {
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.db.get_setting(key)?.is_some() {
                continue;
            }
            self.db.set_setting(key, def.default, type_str(def.secret))?;
        }
        Ok(())
    }

    /// Migrate settings from environment variables to DB (one-time).
    pub fn migrate_from_env(&self) -> Result<u32, anyhow::Error> {
        let mut migrated = 0u32;
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.db.get_setting(key)?.is_some() {
                continue;
            }
            let Ok(env_val) = std::env::var(key) else {
                continue;
            };
            if env_val.is_empty() {
                continue;
            }
            if let Err(e) = validate_setting(key, &env_val) {
                tracing::warn!("Ignoring invalid env setting {key}: {e}");
                continue;
            }
            self.db.set_setting(key, &env_val, type_str(def.secret))?;
            tracing::info!("Migrated setting from env: {key}");
            migrated += 1;
        }
        Ok(migrated)
    }

    /// Report which features can run with the current settings.
    pub fn check_feature_status(&self) -> Result<FeatureStatus, anyhow::Error> {
        let mut status = FeatureStatus::default();

        for (key, def) in DEFAULT_SETTINGS.iter() {
            if def.required && self.get_setting(key).unwrap_or_default().is_empty() {
                status.missing_settings.push(key.to_string());
            }
        }
        status.missing_settings.sort();

        status.api_configured = !status
            .missing_settings
            .iter()
            .any(|k| k == "API_BASE_URL" || k == "API_TOKEN");

        status.push_configured = !self
            .get_setting("VAPID_PUBLIC_KEY")
            .unwrap_or_default()
            .is_empty();
        if !status.push_configured {
            status
                .warnings
                .push("VAPID_PUBLIC_KEY is empty - push delivery disabled, polling only".into());
        }

        Ok(status)
    }

}

fn type_str(secret: bool) -> &'static str {
    if secret { "secret" } else { "normal" }
}
