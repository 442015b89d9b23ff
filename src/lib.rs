//! BLE central-role session manager.
//!
//! Discovers nearby peripherals, connects to one, resolves a well-known GATT
//! service and its RX characteristic, subscribes to notifications, and
//! exchanges data with the peripheral, surfacing lifecycle events to the
//! embedding host.
//!
//! The platform BLE stack is abstracted behind
//! [`BleTransport`](infrastructure::transport::BleTransport): the crate
//! submits non-blocking requests and consumes the stack's asynchronous
//! callbacks from an event channel. Exactly one peripheral connection is
//! active at a time.
//!
//! ```no_run
//! use blesession::{BleSessionManager, SessionConfig, SessionEvent};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! # fn platform_transport(
//! #     tx: mpsc::UnboundedSender<blesession::TransportEvent>,
//! # ) -> Arc<dyn blesession::BleTransport> { unimplemented!() }
//! # async fn run() {
//! let (transport_tx, transport_rx) = mpsc::unbounded_channel();
//! let (event_tx, mut events) = mpsc::unbounded_channel();
//! let transport = platform_transport(transport_tx);
//!
//! let manager = BleSessionManager::new(
//!     transport,
//!     transport_rx,
//!     event_tx,
//!     SessionConfig::default(),
//! );
//! manager.initialize().unwrap();
//! manager.start_scan().unwrap();
//! while let Some(event) = events.recv().await {
//!     if event == SessionEvent::ScanComplete {
//!         break;
//!     }
//! }
//! # }
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::error::BleError;
pub use domain::models::{
    ConnectOutcome, ConnectionState, DeviceAddress, InitOutcome, PeripheralIdentity, SessionEvent,
};
pub use domain::registry::{DeviceListing, DeviceRegistry};
pub use domain::settings::{LogSettings, SessionConfig};
pub use infrastructure::bluetooth::BleSessionManager;
pub use infrastructure::logging::{init_logger, LoggingGuard};
pub use infrastructure::transport::{
    BleTransport, CharacteristicHandle, DiscoveredCharacteristic, DiscoveredService, GattStatus,
    LinkState, ServiceHandle, SessionHandle, TransportError, TransportEvent,
};
