//! GATT connection state machine and data path.
//!
//! Owns the single active transport handle, the characteristic table, and the
//! rx buffer. Caller-facing requests (`request_connect`, `request_disconnect`,
//! `send`) and dispatcher-driven transitions (`on_*`) both run under the one
//! mutex the facade wraps this type in; transport calls made here are
//! non-blocking request submissions, so holding the lock across them is fine.

use crate::domain::error::BleError;
use crate::domain::models::{ConnectionState, DeviceAddress};
use crate::infrastructure::transport::{
    BleTransport, CharacteristicHandle, DiscoveredService, GattStatus, SessionHandle,
    TransportError,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How a service-discovery result was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Session advanced to `Ready`. `degraded` is set when the well-known
    /// service or its RX characteristic was missing; the session is then
    /// inert (`send` fails `NotReady`) until reconnect.
    Ready { degraded: bool },
    /// Discovery reported a failure status; session torn down.
    Failed,
    /// Event did not apply to the current state.
    Ignored,
}

/// How a link-disconnected event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The link dropped before the session ever reached `Ready`.
    ConnectFailed,
    /// An established session ended (caller-requested or peer-initiated).
    Lost,
    /// Already disconnected; nothing to do.
    Ignored,
}

/// The single GATT session. Exactly one per manager; at most one non-idle
/// connection exists at any time.
pub struct GattSession {
    state: ConnectionState,
    target: Option<DeviceAddress>,
    handle: Option<SessionHandle>,
    characteristics: HashMap<Uuid, CharacteristicHandle>,
    rx_buffer: Vec<u8>,
    service_uuid: Uuid,
    rx_char_uuid: Uuid,
}

impl GattSession {
    pub fn new(service_uuid: Uuid, rx_char_uuid: Uuid) -> Self {
        Self {
            state: ConnectionState::Idle,
            target: None,
            handle: None,
            characteristics: HashMap::new(),
            rx_buffer: Vec::new(),
            service_uuid,
            rx_char_uuid,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn target(&self) -> Option<&DeviceAddress> {
        self.target.as_ref()
    }

    pub(crate) fn handle(&self) -> Option<&SessionHandle> {
        self.handle.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Handle of the RX characteristic, if discovery registered one.
    pub fn rx_characteristic(&self) -> Option<CharacteristicHandle> {
        self.characteristics.get(&self.rx_char_uuid).copied()
    }

    /// Most recent payload received from the RX characteristic. May be empty
    /// or stale; only the last write is retained.
    pub fn receive_latest(&self) -> Vec<u8> {
        self.rx_buffer.clone()
    }

    /// Drop everything back to `Idle`, closing any live handle.
    pub fn reset(&mut self, transport: &dyn BleTransport) {
        if let Some(handle) = self.handle.take() {
            transport.close(handle);
        }
        self.characteristics.clear();
        self.rx_buffer.clear();
        self.target = None;
        self.state = ConnectionState::Idle;
    }

    /// Ask the transport to open a connection toward `address`.
    ///
    /// `Ok` means the request was accepted, not that the connection
    /// succeeded; completion arrives through the dispatcher. While a session
    /// is live for a different address the request is rejected outright. A
    /// repeat connect to the current target retries on the existing handle.
    pub fn request_connect(
        &mut self,
        transport: &dyn BleTransport,
        address: DeviceAddress,
    ) -> Result<(), BleError> {
        if !self.state.accepts_connect() {
            if self.target.as_ref() == Some(&address) {
                if let Some(handle) = &self.handle {
                    debug!(%address, "connect retry on existing handle");
                    transport.reconnect(handle)?;
                    return Ok(());
                }
            }
            warn!(%address, state = ?self.state, "connect rejected: session busy");
            return Err(BleError::Busy);
        }

        let handle = transport.connect_gatt(&address).map_err(|e| match e {
            TransportError::UnknownDevice(addr) => BleError::InvalidAddress(addr),
            other => BleError::Transport(other),
        })?;

        info!(%address, "connection attempt started");
        self.handle = Some(handle);
        self.target = Some(address);
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Ask the transport for an orderly disconnect. Idempotent when already
    /// disconnected; cleanup happens once the transport confirms.
    pub fn request_disconnect(&mut self, transport: &dyn BleTransport) -> Result<(), BleError> {
        match self.state {
            ConnectionState::Idle
            | ConnectionState::Disconnected
            | ConnectionState::Disconnecting => Ok(()),
            _ => {
                if let Some(handle) = &self.handle {
                    transport.disconnect(handle)?;
                }
                info!(peer = ?self.target, "disconnect requested");
                self.state = ConnectionState::Disconnecting;
                Ok(())
            }
        }
    }

    /// Write `data` to the RX characteristic.
    ///
    /// `Ok` means the transport accepted the write request, not that the
    /// peripheral received it.
    pub fn send(&mut self, transport: &dyn BleTransport, data: &[u8]) -> Result<(), BleError> {
        if self.state != ConnectionState::Ready {
            return Err(BleError::NotReady);
        }
        let characteristic = self.rx_characteristic().ok_or(BleError::NotReady)?;
        let handle = self.handle.as_ref().ok_or(BleError::NotReady)?;
        transport.write_characteristic(handle, characteristic, data)?;
        debug!(len = data.len(), "write submitted");
        Ok(())
    }

    /// Transport reported the physical link came up: start service discovery.
    pub fn on_link_connected(&mut self, transport: &dyn BleTransport) -> bool {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "ignoring connected event outside Connecting");
            return false;
        }
        info!(peer = ?self.target, "link established, discovering services");
        self.state = ConnectionState::ServiceDiscovering;
        if let Some(handle) = &self.handle {
            if let Err(e) = transport.discover_services(handle) {
                error!(error = %e, "service discovery request refused");
            }
        }
        true
    }

    /// Transport reported the physical link dropped (confirmation of our own
    /// disconnect, or peer-initiated). Releases the handle and clears the
    /// characteristic table.
    pub fn on_link_disconnected(&mut self, transport: &dyn BleTransport) -> Teardown {
        let outcome = match self.state {
            ConnectionState::Idle | ConnectionState::Disconnected => return Teardown::Ignored,
            ConnectionState::Connecting | ConnectionState::ServiceDiscovering => {
                Teardown::ConnectFailed
            }
            ConnectionState::Ready | ConnectionState::Disconnecting => Teardown::Lost,
        };
        info!(peer = ?self.target, ?outcome, "link down, session closed");
        self.teardown(transport);
        outcome
    }

    fn teardown(&mut self, transport: &dyn BleTransport) {
        if let Some(handle) = self.handle.take() {
            transport.close(handle);
        }
        self.characteristics.clear();
        self.target = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Transport finished service discovery.
    ///
    /// On success the characteristic table is rebuilt from the well-known
    /// service and, when the RX characteristic is present, notifications are
    /// enabled and an initial read is issued. A missing service or
    /// characteristic is logged but still advances to `Ready`: callers get an
    /// explicit `NotReady` from `send` rather than a dead session object.
    pub fn on_services_discovered(
        &mut self,
        transport: &dyn BleTransport,
        status: GattStatus,
        services: &[DiscoveredService],
    ) -> DiscoveryOutcome {
        if self.state != ConnectionState::ServiceDiscovering {
            warn!(state = ?self.state, "ignoring discovery result outside ServiceDiscovering");
            return DiscoveryOutcome::Ignored;
        }
        if !status.is_success() {
            warn!(?status, "service discovery failed");
            self.teardown(transport);
            return DiscoveryOutcome::Failed;
        }

        self.characteristics.clear();
        let mut degraded = true;
        match services.iter().find(|s| s.uuid == self.service_uuid) {
            None => {
                warn!(service = %self.service_uuid, "well-known service not present on peripheral");
            }
            Some(service) => {
                for characteristic in &service.characteristics {
                    self.characteristics
                        .insert(characteristic.uuid, characteristic.handle);
                }
                match self.rx_characteristic() {
                    None => {
                        warn!(rx = %self.rx_char_uuid, "rx characteristic not found in service");
                    }
                    Some(rx) => {
                        degraded = false;
                        if let Some(handle) = &self.handle {
                            if let Err(e) =
                                transport.set_characteristic_notification(handle, rx, true)
                            {
                                warn!(error = %e, "notification subscribe refused");
                            }
                            if let Err(e) = transport.read_characteristic(handle, rx) {
                                warn!(error = %e, "initial read refused");
                            }
                        }
                    }
                }
            }
        }

        info!(degraded, "session ready");
        self.state = ConnectionState::Ready;
        DiscoveryOutcome::Ready { degraded }
    }

    /// Characteristic read/notification arrived. Only RX payloads update the
    /// buffer; everything else is ignored. Returns whether the payload was
    /// taken.
    pub fn on_characteristic_update(&mut self, uuid: Uuid, value: &[u8]) -> bool {
        if uuid != self.rx_char_uuid {
            debug!(%uuid, "ignoring update from non-rx characteristic");
            return false;
        }
        // Overwrite, never append: last-write-wins
        self.rx_buffer = value.to_vec();
        true
    }
}
