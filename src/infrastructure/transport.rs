//! Abstraction over the platform BLE adapter and GATT transport.
//!
//! The session core never talks to an OS Bluetooth stack directly. It submits
//! non-blocking requests through [`BleTransport`] and observes every
//! asynchronous outcome as a [`TransportEvent`] on an mpsc channel whose sole
//! consumer is the event dispatcher. Implementations must deliver events for a
//! given connection in the order the radio emits them.

use crate::domain::models::DeviceAddress;
use thiserror::Error;
use uuid::Uuid;

/// Opaque reference to a resolved GATT service, minted by the transport.
/// Valid for one connection lifetime; stale after disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle(pub u32);

/// Opaque reference to a characteristic within a resolved service.
/// Same lifetime rules as [`ServiceHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u32);

/// Owning token for one transport connection.
///
/// Deliberately not `Clone`: the GATT session holds the only copy and
/// releases it exactly once via [`BleTransport::close`].
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Physical link state reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

/// Status code attached to GATT operation results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    Failure(i32),
}

impl GattStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// One characteristic found during service discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    pub uuid: Uuid,
    pub handle: CharacteristicHandle,
}

/// One service found during service discovery, with its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub uuid: Uuid,
    pub handle: ServiceHandle,
    pub characteristics: Vec<DiscoveredCharacteristic>,
}

/// Asynchronous callbacks from the BLE stack, as one tagged variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A peripheral advertisement was seen during an active scan.
    DeviceDiscovered {
        address: DeviceAddress,
        name: Option<String>,
    },
    /// The physical link to the connected peripheral changed state.
    ConnectionChange(LinkState),
    /// Service discovery finished. `services` is the resolved GATT table;
    /// handles in it stay valid until the connection is closed.
    ServicesDiscovered {
        status: GattStatus,
        services: Vec<DiscoveredService>,
    },
    /// A characteristic was read or pushed a notification.
    CharacteristicUpdate { uuid: Uuid, value: Vec<u8> },
    /// Result of a remote RSSI read, in dBm.
    RssiRead { status: GattStatus, rssi: i16 },
}

/// Errors from transport request submission.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("bluetooth adapter unavailable")]
    AdapterUnavailable,
    #[error("unknown device: {0}")]
    UnknownDevice(String),
    #[error("request rejected by the BLE stack: {0}")]
    Rejected(String),
    #[error("handle does not belong to the active connection")]
    StaleHandle,
}

/// Request-submission surface of the platform BLE stack.
///
/// Every method returns as soon as the request is handed to the stack; results
/// arrive later as [`TransportEvent`]s. Callers must not treat an `Ok` return
/// as a delivery or completion guarantee.
pub trait BleTransport: Send + Sync {
    /// Whether BLE hardware is present and enabled.
    fn adapter_available(&self) -> bool;

    fn start_scan(&self) -> Result<(), TransportError>;
    fn stop_scan(&self) -> Result<(), TransportError>;

    /// Open a GATT connection attempt toward `address`.
    fn connect_gatt(&self, address: &DeviceAddress) -> Result<SessionHandle, TransportError>;

    /// Retry the transport-level connect on an existing handle.
    fn reconnect(&self, handle: &SessionHandle) -> Result<(), TransportError>;

    /// Request an orderly disconnect; confirmation arrives as a
    /// [`LinkState::Disconnected`] event.
    fn disconnect(&self, handle: &SessionHandle) -> Result<(), TransportError>;

    /// Release the connection's resources. Consumes the handle so it can
    /// only happen once per connection lifecycle.
    fn close(&self, handle: SessionHandle);

    fn discover_services(&self, handle: &SessionHandle) -> Result<(), TransportError>;

    fn read_characteristic(
        &self,
        handle: &SessionHandle,
        characteristic: CharacteristicHandle,
    ) -> Result<(), TransportError>;

    fn write_characteristic(
        &self,
        handle: &SessionHandle,
        characteristic: CharacteristicHandle,
        value: &[u8],
    ) -> Result<(), TransportError>;

    fn set_characteristic_notification(
        &self,
        handle: &SessionHandle,
        characteristic: CharacteristicHandle,
        enabled: bool,
    ) -> Result<(), TransportError>;

    fn read_remote_rssi(&self, handle: &SessionHandle) -> Result<(), TransportError>;
}
