//! Push payload ingress.
//!
//! Raw payloads have the shape `{type, title?, body?, data?: {bookingId?}}`
//! but providers disagree on casing and nesting; everything is normalized
//! here so handlers only see [`PushMessage`].

use booking_api::NotificationKind;
use booking_api::models::booking_id_from_data;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub kind: NotificationKind,
    pub title: Option<String>,
    pub body: Option<String>,
    pub booking_id: Option<String>,
    pub data: Value,
}

impl PushMessage {
    pub fn from_value(raw: &Value) -> Self {
        let data = raw.get("data").cloned().unwrap_or(Value::Null);
        let notification = raw.get("notification");

        let tag = string_field(raw, &["type", "notificationType"])
            .or_else(|| string_field(&data, &["type", "notificationType"]))
            .unwrap_or_default();

        let title = string_field(raw, &["title"])
            .or_else(|| notification.and_then(|n| string_field(n, &["title"])));
        let body = string_field(raw, &["body"])
            .or_else(|| notification.and_then(|n| string_field(n, &["body"])));

        let booking_id = booking_id_from_data(&data)
            .or_else(|| booking_id_from_data(raw))
            .map(ToOwned::to_owned);

        Self {
            kind: NotificationKind::from_tag(&tag),
            title,
            body,
            booking_id,
            data,
        }
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}
