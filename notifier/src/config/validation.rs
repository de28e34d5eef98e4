//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid regex"));
static RE_BASE64URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+=*$").expect("valid regex"));

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "API_BASE_URL" => {
            if !value.is_empty() && !RE_HTTP_URL.is_match(value) {
                return Err("must be an http(s) URL".into());
            }
        }
        "VAPID_PUBLIC_KEY" => {
            if !value.is_empty() && !RE_BASE64URL.is_match(value) {
                return Err("must be a base64url-encoded key".into());
            }
        }
        "BACKGROUND_SCRIPT_URL" => {
            if value.is_empty() {
                return Err("must not be empty".into());
            }
        }
        "POLL_INTERVAL_SECS" => validate_int_range(value, 5, 3600)?,
        "FEED_PAGE_SIZE" => validate_int_range(value, 1, 100)?,
        "DEVICE_TYPE" => {
            if !["web", "desktop", "ios", "android"].contains(&value) {
                return Err("must be one of 'web', 'desktop', 'ios', 'android'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if !(min..=max).contains(&v) {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
