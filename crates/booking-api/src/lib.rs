//! Booking service client library.
//!
//! Provides the [`BookingService`] capability consumed by the notifier
//! (device tokens, notification settings, notification feed, pending
//! bookings) and a REST implementation backed by reqwest.

pub mod client;
pub mod models;

use async_trait::async_trait;

pub use client::BookingApiClient;
pub use models::{
    BookingStatus, DeviceRegistrationRequest, DeviceType, Notification, NotificationKind,
    NotificationPage, NotificationTypeToggles, PendingBooking,
};

/// Unified error type for the booking-api crate.
#[derive(Debug, thiserror::Error)]
pub enum BookingApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Authentication required: no valid token")]
    AuthRequired,

    #[error("Booking API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl BookingApiError {
    /// Whether the server rejected the request for authentication reasons.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            BookingApiError::ApiError {
                status: 401 | 403,
                ..
            } | BookingApiError::AuthRequired
        )
    }
}

/// Remote operations the notifier depends on.
///
/// Implemented by [`BookingApiClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn register_device_token(
        &self,
        request: &DeviceRegistrationRequest,
    ) -> Result<(), BookingApiError>;

    async fn unregister_device_token(&self, device_id: &str) -> Result<(), BookingApiError>;

    async fn get_notification_settings(&self) -> Result<NotificationTypeToggles, BookingApiError>;

    async fn update_notification_settings(
        &self,
        toggles: &NotificationTypeToggles,
    ) -> Result<(), BookingApiError>;

    /// `is_read` of `None` lists both read and unread entries.
    async fn list_notifications(
        &self,
        page: u32,
        limit: u32,
        is_read: Option<bool>,
    ) -> Result<NotificationPage, BookingApiError>;

    async fn get_unread_notification_count(&self) -> Result<u64, BookingApiError>;

    async fn mark_notification_read(&self, id: &str) -> Result<(), BookingApiError>;

    async fn mark_all_notifications_read(&self) -> Result<(), BookingApiError>;

    /// Booking ids awaiting operator confirmation, oldest first.
    async fn list_pending_bookings(
        &self,
        service_center_id: &str,
    ) -> Result<Vec<String>, BookingApiError>;

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<(), BookingApiError>;
}
