//! Device identity reported when registering push tokens.

use booking_api::DeviceType;
use notifier_db::{Database, DbError};

/// Identity of this installation. The id is generated once and persisted;
/// the name is derived from the host platform on every start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub device_type: DeviceType,
    pub device_name: String,
}

impl DeviceIdentity {
    pub fn load_or_create(db: &Database, device_type: DeviceType) -> Result<Self, DbError> {
        let device_id = db.get_or_create_device_id()?;
        Ok(Self {
            device_id,
            device_type,
            device_name: derive_device_name(device_type),
        })
    }
}

fn derive_device_name(device_type: DeviceType) -> String {
    let os = match std::env::consts::OS {
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        "ios" => "iOS",
        "android" => "Android",
        other => other,
    };
    let kind = match device_type {
        DeviceType::Web => "Browser",
        DeviceType::Desktop => "Desktop",
        DeviceType::Ios | DeviceType::Android => "Mobile",
    };
    format!("{kind} on {os} ({})", std::env::consts::ARCH)
}
