//! Device registration for pass update notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use glowpass_core::{CustomerId, DeviceLibraryId, PassTypeId, PushToken};

/// A device's interest in updates for one pass.
///
/// Identity is the composite `(device_library_id, pass_type_id,
/// serial_number)` tuple: a device may hold several passes, and a pass may be
/// installed on several devices. Re-registering the same identity overwrites
/// `push_token` and `last_updated` (idempotent upsert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRegistration {
    pub device_library_id: DeviceLibraryId,
    pub pass_type_id: PassTypeId,
    pub serial_number: CustomerId,
    /// Vendor-issued push address; rotates at the OS's discretion.
    pub push_token: PushToken,
    pub last_updated: DateTime<Utc>,
}

impl DeviceRegistration {
    /// Whether `other` names the same composite identity.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.device_library_id == other.device_library_id
            && self.pass_type_id == other.pass_type_id
            && self.serial_number == other.serial_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(token: &str) -> DeviceRegistration {
        DeviceRegistration {
            device_library_id: DeviceLibraryId::new("device-1"),
            pass_type_id: PassTypeId::new("pass.com.glowpass"),
            serial_number: CustomerId::new("C1"),
            push_token: PushToken::new(token),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_same_identity_ignores_token() {
        let a = registration("token-a");
        let b = registration("token-b");
        assert!(a.same_identity(&b));
        assert_ne!(a.push_token, b.push_token);
    }
}
