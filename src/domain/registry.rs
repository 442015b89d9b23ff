//! Registry of peripherals discovered during a scan session.

use crate::domain::models::{DeviceAddress, PeripheralIdentity};
use serde_json::json;

/// Sentinel returned by the JSON export when a finished scan found nothing.
pub const NO_DEVICE_FOUND: &str = "NO DEVICE FOUND";

/// Sentinel returned by the JSON export while a scan is still running.
pub const SCAN_IN_PROGRESS: &str = "SCAN IN PROGRESS";

/// Deduplicated, insertion-ordered collection of discovered peripherals.
///
/// Identity is the device address: re-observing a device during the same scan
/// neither re-appends it nor moves its position. Cleared and repopulated by
/// each scan session.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<PeripheralIdentity>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Record a discovery. Returns `false` when the address is already known.
    pub fn insert(&mut self, identity: PeripheralIdentity) -> bool {
        if self.contains(&identity.address) {
            return false;
        }
        self.devices.push(identity);
        true
    }

    pub fn contains(&self, address: &DeviceAddress) -> bool {
        self.devices.iter().any(|d| &d.address == address)
    }

    pub fn get(&self, index: usize) -> Option<&PeripheralIdentity> {
        self.devices.get(index)
    }

    pub fn find(&self, address: &DeviceAddress) -> Option<&PeripheralIdentity> {
        self.devices.iter().find(|d| &d.address == address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Snapshot in discovery order.
    pub fn snapshot(&self) -> Vec<PeripheralIdentity> {
        self.devices.clone()
    }
}

/// Result of asking for the discovered-device list.
///
/// `InProgress` is distinct from `NoneFound` so callers can tell an unfinished
/// scan apart from a finished scan that came up empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceListing {
    InProgress,
    NoneFound,
    Found(Vec<PeripheralIdentity>),
}

impl DeviceListing {
    /// Serialize for the host controller: `{"data": ["<address>", ...]}` in
    /// discovery order, or one of the sentinel strings.
    pub fn export(&self) -> String {
        match self {
            Self::InProgress => SCAN_IN_PROGRESS.to_string(),
            Self::NoneFound => NO_DEVICE_FOUND.to_string(),
            Self::Found(devices) => {
                let addresses: Vec<&str> = devices.iter().map(|d| d.address.as_str()).collect();
                json!({ "data": addresses }).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(address: &str) -> PeripheralIdentity {
        PeripheralIdentity::new(address, None)
    }

    #[test]
    fn test_duplicate_addresses_kept_once_in_first_seen_order() {
        let mut registry = DeviceRegistry::new();
        assert!(registry.insert(identity("AA:BB")));
        assert!(registry.insert(identity("CC:DD")));
        assert!(!registry.insert(identity("AA:BB")));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].address, DeviceAddress::from("AA:BB"));
        assert_eq!(snapshot[1].address, DeviceAddress::from("CC:DD"));
    }

    #[test]
    fn test_reobservation_does_not_move_position() {
        let mut registry = DeviceRegistry::new();
        registry.insert(identity("AA:BB"));
        registry.insert(identity("CC:DD"));
        registry.insert(identity("EE:FF"));
        registry.insert(identity("CC:DD"));

        let addresses: Vec<String> = registry
            .snapshot()
            .iter()
            .map(|d| d.address.to_string())
            .collect();
        assert_eq!(addresses, vec!["AA:BB", "CC:DD", "EE:FF"]);
    }

    #[test]
    fn test_clear_forgets_previous_scan() {
        let mut registry = DeviceRegistry::new();
        registry.insert(identity("AA:BB"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.insert(identity("AA:BB")));
    }

    #[test]
    fn test_lookup_by_index_and_address() {
        let mut registry = DeviceRegistry::new();
        registry.insert(identity("AA:BB"));
        registry.insert(identity("CC:DD"));

        assert_eq!(registry.get(1).map(|d| d.address.as_str()), Some("CC:DD"));
        assert!(registry.find(&DeviceAddress::from("AA:BB")).is_some());
        assert!(registry.find(&DeviceAddress::from("11:22")).is_none());
        assert!(registry.get(5).is_none());
    }

    #[test]
    fn test_listing_export_sentinels() {
        assert_eq!(DeviceListing::InProgress.export(), SCAN_IN_PROGRESS);
        assert_eq!(DeviceListing::NoneFound.export(), NO_DEVICE_FOUND);
    }

    #[test]
    fn test_listing_export_json_preserves_order() {
        let listing = DeviceListing::Found(vec![identity("AA:BB"), identity("CC:DD")]);
        assert_eq!(listing.export(), r#"{"data":["AA:BB","CC:DD"]}"#);
    }
}
