//! Session facade: the one coordinating object per process.
//!
//! Construct it explicitly, keep exactly one instance, and pass it by
//! reference to call sites; there is no implicit global. All methods submit
//! requests and return immediately - asynchronous outcomes arrive on the
//! `SessionEvent` channel supplied at construction.

use crate::domain::error::BleError;
use crate::domain::models::{
    ConnectionState, DeviceAddress, InitOutcome, PeripheralIdentity, SessionEvent,
};
use crate::domain::registry::{DeviceListing, DeviceRegistry};
use crate::domain::settings::SessionConfig;
use crate::infrastructure::bluetooth::gatt::GattSession;
use crate::infrastructure::bluetooth::scanner::ScanController;
use crate::infrastructure::bluetooth::{dispatcher, lock};
use crate::infrastructure::transport::{BleTransport, TransportEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub struct BleSessionManager {
    transport: Arc<dyn BleTransport>,
    config: SessionConfig,
    registry: Arc<Mutex<DeviceRegistry>>,
    session: Arc<Mutex<GattSession>>,
    scanner: ScanController,
    notify: mpsc::UnboundedSender<SessionEvent>,
    // consumed by the dispatcher on first initialize()
    transport_events: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl BleSessionManager {
    /// Wire up a manager around `transport`.
    ///
    /// `transport_events` is the channel the transport implementation pushes
    /// its callbacks into; `notify` is where lifecycle notifications for the
    /// host land.
    pub fn new(
        transport: Arc<dyn BleTransport>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        notify: mpsc::UnboundedSender<SessionEvent>,
        config: SessionConfig,
    ) -> Self {
        let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
        let session = Arc::new(Mutex::new(GattSession::new(
            config.service_uuid,
            config.rx_char_uuid,
        )));
        let scanner = ScanController::new(transport.clone(), registry.clone(), notify.clone());
        Self {
            transport,
            config,
            registry,
            session,
            scanner,
            notify,
            transport_events: Mutex::new(Some(transport_events)),
            dispatcher: Mutex::new(None),
        }
    }

    /// Check the adapter, reset all session state, and start the event
    /// dispatcher. Every call re-initializes from scratch; nothing survives
    /// across calls. Must run inside a Tokio runtime.
    ///
    /// Adapter absence short-circuits here, before any transport interaction,
    /// and is reported only through the `Initialized` notification (plus the
    /// returned error).
    pub fn initialize(&self) -> Result<(), BleError> {
        if !self.transport.adapter_available() {
            error!("initialize failed: bluetooth adapter unavailable");
            let _ = self.notify.send(SessionEvent::Initialized(InitOutcome::Failed(
                "bluetooth adapter unavailable".to_string(),
            )));
            return Err(BleError::AdapterUnavailable);
        }

        self.scanner.stop();
        lock(&self.registry).clear();
        lock(&self.session).reset(self.transport.as_ref());

        if let Some(events) = lock(&self.transport_events).take() {
            let handle = dispatcher::spawn(
                self.transport.clone(),
                events,
                self.session.clone(),
                self.registry.clone(),
                self.notify.clone(),
                Duration::from_millis(self.config.rssi_interval_ms),
            );
            *lock(&self.dispatcher) = Some(handle);
        }

        info!("session manager initialized");
        let _ = self
            .notify
            .send(SessionEvent::Initialized(InitOutcome::Success));
        Ok(())
    }

    /// Begin a discovery window using the configured duration.
    pub fn start_scan(&self) -> Result<(), BleError> {
        self.scanner
            .start(Duration::from_millis(self.config.scan_duration_ms))
    }

    /// Begin a discovery window of an explicit duration.
    pub fn start_scan_for(&self, duration: Duration) -> Result<(), BleError> {
        self.scanner.start(duration)
    }

    /// Cancel an in-progress scan early. The transport scan is still halted
    /// and the completion notification still fires.
    pub fn stop_scan(&self) {
        self.scanner.stop()
    }

    pub fn is_scan_in_progress(&self) -> bool {
        self.scanner.is_scanning()
    }

    /// Discovered devices in discovery order, with the in-progress and
    /// none-found cases kept distinct. Use [`DeviceListing::export`] for the
    /// serialized form.
    pub fn device_listing(&self) -> DeviceListing {
        if self.is_scan_in_progress() {
            return DeviceListing::InProgress;
        }
        let registry = lock(&self.registry);
        if registry.is_empty() {
            DeviceListing::NoneFound
        } else {
            DeviceListing::Found(registry.snapshot())
        }
    }

    pub fn discovered_devices(&self) -> Vec<PeripheralIdentity> {
        lock(&self.registry).snapshot()
    }

    /// Connect to a device found in the current scan results. `Ok` means the
    /// request was accepted; success or failure arrives as a `Connected`
    /// notification.
    pub fn connect(&self, address: &DeviceAddress) -> Result<(), BleError> {
        if !lock(&self.registry).contains(address) {
            return Err(BleError::InvalidAddress(address.to_string()));
        }
        lock(&self.session).request_connect(self.transport.as_ref(), address.clone())
    }

    /// Connect to the scan result at `index` (discovery order).
    pub fn connect_by_index(&self, index: usize) -> Result<(), BleError> {
        let address = lock(&self.registry)
            .get(index)
            .map(|d| d.address.clone())
            .ok_or_else(|| BleError::InvalidAddress(format!("index {index}")))?;
        lock(&self.session).request_connect(self.transport.as_ref(), address)
    }

    /// Request teardown of the active session. Idempotent when already
    /// disconnected; the `Disconnected` notification fires once the transport
    /// confirms.
    pub fn disconnect(&self) -> Result<(), BleError> {
        lock(&self.session).request_disconnect(self.transport.as_ref())
    }

    /// Write `data` to the RX characteristic. Fails `NotReady` unless the
    /// session is `Ready` with a registered characteristic.
    pub fn send(&self, data: &[u8]) -> Result<(), BleError> {
        lock(&self.session).send(self.transport.as_ref(), data)
    }

    /// The most recently received payload; empty if nothing arrived yet.
    pub fn receive_latest(&self) -> Vec<u8> {
        lock(&self.session).receive_latest()
    }

    /// True iff the session is `Ready`.
    pub fn is_connected(&self) -> bool {
        lock(&self.session).is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.session).state()
    }
}

impl Drop for BleSessionManager {
    fn drop(&mut self) {
        self.scanner.stop();
        if let Some(dispatcher) = lock(&self.dispatcher).take() {
            dispatcher.abort();
        }
    }
}
