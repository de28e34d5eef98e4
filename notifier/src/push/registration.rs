//! Background-script registration lifecycle.

use std::time::Duration;

use super::platform::{RegistrationHandle, WorkerState};
use super::{PushChannelManager, PushError};
use crate::lock;

/// Upper bound for registering and activating the background script.
pub const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Redundant,
    Platform(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundRegistrationState {
    Unregistered,
    Registering,
    Installing,
    Activated,
    Failed(FailureReason),
}

impl PushChannelManager {
    pub fn registration_state(&self) -> BackgroundRegistrationState {
        self.registration_state.borrow().clone()
    }

    fn set_registration_state(&self, state: BackgroundRegistrationState) {
        tracing::debug!(state = ?state, "Background registration state");
        self.registration_state.send_replace(state);
    }

    /// Registration cached after a successful activation.
    pub(super) fn active_registration(&self) -> Option<RegistrationHandle> {
        if self.registration_state() != BackgroundRegistrationState::Activated {
            return None;
        }
        lock(&self.active_registration).clone()
    }

    /// Ensure the background script is registered and active.
    ///
    /// Concurrent callers queue behind the first one and then observe its
    /// result, so the platform sees at most one registration. Once activated
    /// the handle is reused for the rest of the process.
    pub async fn register_background_script(&self) -> Result<RegistrationHandle, PushError> {
        let _guard = self.registration_lock.lock().await;

        if let Some(handle) = self.active_registration() {
            return Ok(handle);
        }
        if !self.is_supported() {
            return Err(PushError::Unsupported);
        }

        self.set_registration_state(BackgroundRegistrationState::Registering);
        let outcome = tokio::time::timeout(ACTIVATION_TIMEOUT, self.register_and_activate()).await;

        match outcome {
            Ok(Ok(handle)) => {
                *lock(&self.active_registration) = Some(handle.clone());
                self.set_registration_state(BackgroundRegistrationState::Activated);
                tracing::info!(scope = %handle.scope, "Background script active");
                Ok(handle)
            }
            Ok(Err(e)) => {
                let reason = match &e {
                    PushError::RegistrationRedundant => FailureReason::Redundant,
                    other => FailureReason::Platform(other.to_string()),
                };
                self.set_registration_state(BackgroundRegistrationState::Failed(reason));
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = ACTIVATION_TIMEOUT.as_secs(),
                    "Background script activation timed out"
                );
                self.set_registration_state(BackgroundRegistrationState::Failed(
                    FailureReason::Timeout,
                ));
                Err(PushError::RegistrationTimeout(ACTIVATION_TIMEOUT))
            }
        }
    }

    async fn register_and_activate(&self) -> Result<RegistrationHandle, PushError> {
        let script_url = self.config.background_script_url.as_str();
        let handle = match self.platform.find_registration(script_url).await? {
            Some(existing) => {
                tracing::debug!(scope = %existing.scope, "Reusing existing background registration");
                existing
            }
            None => {
                tracing::info!(script_url, "Registering background script");
                self.platform.register(script_url).await?
            }
        };

        let mut state_rx = handle.state.clone();
        loop {
            let current = *state_rx.borrow_and_update();
            match current {
                WorkerState::Activated => return Ok(handle),
                WorkerState::Redundant => return Err(PushError::RegistrationRedundant),
                WorkerState::Installing | WorkerState::Installed | WorkerState::Activating => {
                    if self.registration_state() != BackgroundRegistrationState::Installing {
                        self.set_registration_state(BackgroundRegistrationState::Installing);
                    }
                }
            }
            if state_rx.changed().await.is_err() {
                // Platform dropped the registration before it activated.
                return Err(PushError::RegistrationRedundant);
            }
        }
    }
}
