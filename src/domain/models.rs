//! Core data model for the BLE session manager.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque transport-level identifier of a peripheral.
///
/// Stable and unique per physical device for the lifetime of the process;
/// the session manager never interprets its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// A peripheral observed during scanning.
///
/// Created on first observation and never mutated; lives in the
/// [`DeviceRegistry`](crate::domain::registry::DeviceRegistry) until the next
/// scan replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralIdentity {
    pub address: DeviceAddress,
    /// Advertised local name, when the peripheral broadcasts one.
    pub name: Option<String>,
}

impl PeripheralIdentity {
    pub fn new(address: impl Into<DeviceAddress>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }
}

/// State of the single GATT connection.
///
/// `Disconnected` is equivalent to `Idle` for the purpose of accepting a new
/// connect request; both are terminal/initial states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    ServiceDiscovering,
    Ready,
    Disconnecting,
    Disconnected,
}

impl ConnectionState {
    /// True when a new `connect()` may be accepted.
    pub fn accepts_connect(self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected)
    }
}

/// Outcome reported with [`SessionEvent::Initialized`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Success,
    Failed(String),
}

/// Outcome reported with [`SessionEvent::Connected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Success,
    Failure,
}

/// Lifecycle notifications delivered to the embedding caller.
///
/// Synchronous API calls only report whether a request was accepted; every
/// asynchronous outcome surfaces here and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Initialized(InitOutcome),
    Connected(ConnectOutcome),
    ScanComplete,
    Disconnected,
    /// Payload received from the RX characteristic. Last-write-wins: the
    /// session buffer holds only the most recent payload.
    DataReceived(Vec<u8>),
    /// Side-channel signal-strength sample in dBm.
    RssiUpdate(i16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_accept_connect() {
        assert!(ConnectionState::Idle.accepts_connect());
        assert!(ConnectionState::Disconnected.accepts_connect());
        assert!(!ConnectionState::Connecting.accepts_connect());
        assert!(!ConnectionState::ServiceDiscovering.accepts_connect());
        assert!(!ConnectionState::Ready.accepts_connect());
        assert!(!ConnectionState::Disconnecting.accepts_connect());
    }

    #[test]
    fn test_address_display_roundtrip() {
        let address = DeviceAddress::from("AA:BB:CC:DD:EE:FF");
        assert_eq!(address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(address.as_str(), "AA:BB:CC:DD:EE:FF");
    }
}
