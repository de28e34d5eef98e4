//! Booking service REST client.
//!
//! Typed access to the booking service endpoints with Bearer token
//! injection. Every response body is wrapped in a `{ "data": ... }` envelope.

mod bookings;
mod devices;
mod notifications;
mod request;

use async_trait::async_trait;
use url::Url;

use crate::models::{
    BookingStatus, DeviceRegistrationRequest, NotificationPage, NotificationTypeToggles,
};
use crate::{BookingApiError, BookingService};

/// Booking service client with automatic auth header injection.
#[derive(Clone)]
pub struct BookingApiClient {
    pub(super) http: reqwest::Client,
    pub(super) base_url: Url,
    pub(super) access_token: Option<String>,
}

impl BookingApiClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, BookingApiError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    /// Resolve an endpoint path relative to the base URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, BookingApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

impl std::fmt::Debug for BookingApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BookingService for BookingApiClient {
    async fn register_device_token(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<(), BookingApiError> {
        self.register_device(request).await
    }

    async fn unregister_device_token(&self, device_id: &str) -> Result<(), BookingApiError> {
        self.unregister_device(device_id).await
    }

    async fn get_notification_settings(&self) -> Result<NotificationTypeToggles, BookingApiError> {
        self.get_settings().await
    }

    async fn update_notification_settings(
        &self,
        toggles: &NotificationTypeToggles,
    ) -> Result<(), BookingApiError> {
        self.put_settings(toggles).await
    }

    async fn list_notifications(
        &self,
        page: u32,
        limit: u32,
        is_read: Option<bool>,
    ) -> Result<NotificationPage, BookingApiError> {
        self.get_notifications(page, limit, is_read).await
    }

    async fn get_unread_notification_count(&self) -> Result<u64, BookingApiError> {
        self.get_unread_count().await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), BookingApiError> {
        self.mark_read(id).await
    }

    async fn mark_all_notifications_read(&self) -> Result<(), BookingApiError> {
        self.mark_all_read().await
    }

    async fn list_pending_bookings(
        &self,
        service_center_id: &str,
    ) -> Result<Vec<String>, BookingApiError> {
        self.get_pending_bookings(service_center_id).await
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), BookingApiError> {
        self.patch_booking_status(booking_id, status).await
    }
}
