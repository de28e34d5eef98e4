//! Platform seam for push delivery.
//!
//! A [`PushPlatform`] exposes what the host environment offers: permission
//! prompts, background-script registration, token subscription and the
//! foreground message stream.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

/// Outcome of the platform permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// The operator has not been asked yet.
    Default,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub push_api: bool,
    pub notification_api: bool,
}

/// Lifecycle of the platform-side background script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    /// Replaced or discarded; the registration can no longer be used.
    Redundant,
}

/// A background-script registration as reported by the platform.
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    pub scope: String,
    pub state: watch::Receiver<WorkerState>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

#[async_trait]
pub trait PushPlatform: Send + Sync {
    fn capabilities(&self) -> PlatformCapabilities;

    fn permission(&self) -> PermissionState;

    async fn request_permission(&self) -> Result<PermissionState, PlatformError>;

    /// Look up an existing registration for `script_url` without creating one.
    async fn find_registration(
        &self,
        script_url: &str,
    ) -> Result<Option<RegistrationHandle>, PlatformError>;

    async fn register(&self, script_url: &str) -> Result<RegistrationHandle, PlatformError>;

    /// Subscribe for push delivery and return the provider token.
    /// `Ok(None)` means the provider issued no token.
    async fn subscribe(
        &self,
        registration: &RegistrationHandle,
        server_key: &str,
    ) -> Result<Option<String>, PlatformError>;

    /// Raw payloads delivered while the application is in the foreground.
    fn foreground_messages(&self) -> Option<broadcast::Receiver<serde_json::Value>>;
}

/// Platform without push support, used by the headless server.
///
/// Every push feature becomes a no-op and the notifier runs on polling alone.
#[derive(Debug, Default)]
pub struct HeadlessPlatform;

#[async_trait]
impl PushPlatform for HeadlessPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::default()
    }

    fn permission(&self) -> PermissionState {
        PermissionState::Denied
    }

    async fn request_permission(&self) -> Result<PermissionState, PlatformError> {
        Ok(PermissionState::Denied)
    }

    async fn find_registration(
        &self,
        _script_url: &str,
    ) -> Result<Option<RegistrationHandle>, PlatformError> {
        Ok(None)
    }

    async fn register(&self, _script_url: &str) -> Result<RegistrationHandle, PlatformError> {
        Err(PlatformError("background registration unavailable".into()))
    }

    async fn subscribe(
        &self,
        _registration: &RegistrationHandle,
        _server_key: &str,
    ) -> Result<Option<String>, PlatformError> {
        Ok(None)
    }

    fn foreground_messages(&self) -> Option<broadcast::Receiver<serde_json::Value>> {
        None
    }
}
