//! Request and response types for the booking service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope used by every booking service response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// One page of the notification feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

/// A notification created server-side.
///
/// Only `is_read` is ever mutated client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(rename = "type", alias = "notificationType")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Notification {
    /// Booking referenced by the payload, if any.
    pub fn booking_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(booking_id_from_data)
    }
}

/// Extract a booking id from an opaque payload, tolerating key variants.
pub fn booking_id_from_data(data: &serde_json::Value) -> Option<&str> {
    ["bookingId", "booking_id", "bookingUuid", "booking_uuid"]
        .iter()
        .find_map(|key| data.get(key).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Notification type tag, normalized from the casing variants the server
/// and push providers emit (`new-booking`, `NEW_BOOKING`, `newBooking`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    NewBooking,
    BookingConfirmed,
    BookingCancelled,
    BookingReminder,
    System,
    Other(String),
}

impl NotificationKind {
    pub fn from_tag(tag: &str) -> Self {
        let folded: String = tag
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "newbooking" | "bookingnew" | "bookingcreated" => Self::NewBooking,
            "bookingconfirmed" => Self::BookingConfirmed,
            "bookingcancelled" | "bookingcanceled" => Self::BookingCancelled,
            "bookingreminder" => Self::BookingReminder,
            "system" => Self::System,
            _ => Self::Other(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NewBooking => "new-booking",
            Self::BookingConfirmed => "booking-confirmed",
            Self::BookingCancelled => "booking-cancelled",
            Self::BookingReminder => "booking-reminder",
            Self::System => "system",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_new_booking(&self) -> bool {
        matches!(self, Self::NewBooking)
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Per-type notification preferences stored by the booking service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTypeToggles {
    #[serde(default = "enabled_by_default")]
    pub new_booking: bool,
    #[serde(default = "enabled_by_default")]
    pub booking_status: bool,
    #[serde(default = "enabled_by_default")]
    pub booking_reminder: bool,
    #[serde(default = "enabled_by_default")]
    pub system: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for NotificationTypeToggles {
    fn default() -> Self {
        Self {
            new_booking: true,
            booking_status: true,
            booking_reminder: true,
            system: true,
        }
    }
}

/// Target status of an operator decision on a pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingBooking {
    #[serde(alias = "bookingId", alias = "id")]
    pub uuid: String,
}

/// Kind of client registering for push delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Web,
    #[default]
    Desktop,
    Ios,
    Android,
}

impl DeviceType {
    pub fn from_str_setting(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "web" => Self::Web,
            "ios" => Self::Ios,
            "android" => Self::Android,
            _ => Self::Desktop,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistrationRequest {
    pub device_id: String,
    pub device_type: DeviceType,
    pub device_name: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusUpdateRequest {
    pub status: BookingStatus,
}
