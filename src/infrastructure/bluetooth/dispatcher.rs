//! Transport event loop.
//!
//! Single consumer of the transport event channel. Each raw event maps to at
//! most one session transition and one outward notification, applied strictly
//! in the order the transport emitted them. The channel is also the handoff
//! that keeps radio callback threads unblocked: registry writes and payload
//! forwarding happen here, never on the transport side of the channel.

use crate::domain::models::{ConnectOutcome, PeripheralIdentity, SessionEvent};
use crate::domain::registry::DeviceRegistry;
use crate::infrastructure::bluetooth::gatt::{DiscoveryOutcome, GattSession, Teardown};
use crate::infrastructure::bluetooth::{lock, rssi};
use crate::infrastructure::transport::{BleTransport, LinkState, TransportEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Holder for the RSSI poller task. Aborts the current poller when replaced
/// or dropped, so the poller cannot outlive the dispatcher that spawned it -
/// including when the dispatcher itself is aborted mid-session.
struct PollerSlot(Option<JoinHandle<()>>);

impl PollerSlot {
    fn replace(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.0.replace(handle) {
            old.abort();
        }
    }
}

impl Drop for PollerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

pub fn spawn(
    transport: Arc<dyn BleTransport>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    session: Arc<Mutex<GattSession>>,
    registry: Arc<Mutex<DeviceRegistry>>,
    notify: mpsc::UnboundedSender<SessionEvent>,
    rssi_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rssi_poller = PollerSlot(None);
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::DeviceDiscovered { address, name } => {
                    let inserted =
                        lock(&registry).insert(PeripheralIdentity::new(address.clone(), name));
                    if inserted {
                        debug!(%address, "peripheral discovered");
                    }
                }
                TransportEvent::ConnectionChange(LinkState::Connected) => {
                    lock(&session).on_link_connected(transport.as_ref());
                }
                TransportEvent::ConnectionChange(LinkState::Disconnected) => {
                    match lock(&session).on_link_disconnected(transport.as_ref()) {
                        Teardown::ConnectFailed => {
                            let _ = notify.send(SessionEvent::Connected(ConnectOutcome::Failure));
                        }
                        Teardown::Lost => {
                            let _ = notify.send(SessionEvent::Disconnected);
                        }
                        Teardown::Ignored => {}
                    }
                }
                TransportEvent::ServicesDiscovered { status, services } => {
                    let outcome = lock(&session).on_services_discovered(
                        transport.as_ref(),
                        status,
                        &services,
                    );
                    match outcome {
                        DiscoveryOutcome::Ready { .. } => {
                            let _ = notify.send(SessionEvent::Connected(ConnectOutcome::Success));
                            // one poller per connection; a leftover from a
                            // previous connection is stale by definition
                            rssi_poller.replace(rssi::spawn_poller(
                                transport.clone(),
                                session.clone(),
                                rssi_interval,
                            ));
                        }
                        DiscoveryOutcome::Failed => {
                            let _ = notify.send(SessionEvent::Connected(ConnectOutcome::Failure));
                        }
                        DiscoveryOutcome::Ignored => {}
                    }
                }
                TransportEvent::CharacteristicUpdate { uuid, value } => {
                    if lock(&session).on_characteristic_update(uuid, &value) {
                        let _ = notify.send(SessionEvent::DataReceived(value));
                    }
                }
                TransportEvent::RssiRead { status, rssi } => {
                    if status.is_success() {
                        let _ = notify.send(SessionEvent::RssiUpdate(rssi));
                    } else {
                        warn!(?status, "rssi read failed");
                    }
                }
            }
        }
        drop(rssi_poller);
        debug!("transport event channel closed, dispatcher exiting");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConnectionState, DeviceAddress};
    use crate::infrastructure::bluetooth::protocol;
    use crate::infrastructure::transport::testing::{Call, FakeTransport};
    use crate::infrastructure::transport::{
        CharacteristicHandle, DiscoveredCharacteristic, DiscoveredService, GattStatus,
        ServiceHandle,
    };

    struct Harness {
        transport: Arc<FakeTransport>,
        session: Arc<Mutex<GattSession>>,
        registry: Arc<Mutex<DeviceRegistry>>,
        transport_tx: mpsc::UnboundedSender<TransportEvent>,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        _dispatcher: JoinHandle<()>,
    }

    fn harness() -> Harness {
        let transport = Arc::new(FakeTransport::new());
        let session = Arc::new(Mutex::new(GattSession::new(
            protocol::SHIELD_SERVICE_UUID,
            protocol::SHIELD_RX_CHAR_UUID,
        )));
        let registry = Arc::new(Mutex::new(DeviceRegistry::new()));
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (notify_tx, events) = mpsc::unbounded_channel();
        let dispatcher = spawn(
            transport.clone(),
            transport_rx,
            session.clone(),
            registry.clone(),
            notify_tx,
            Duration::from_millis(500),
        );
        Harness {
            transport,
            session,
            registry,
            transport_tx,
            events,
            _dispatcher: dispatcher,
        }
    }

    fn shield_services() -> Vec<DiscoveredService> {
        vec![DiscoveredService {
            uuid: protocol::SHIELD_SERVICE_UUID,
            handle: ServiceHandle(1),
            characteristics: vec![DiscoveredCharacteristic {
                uuid: protocol::SHIELD_RX_CHAR_UUID,
                handle: CharacteristicHandle(7),
            }],
        }]
    }

    async fn settle() {
        // paused clock auto-advances once every task is idle
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_discoveries_are_deduplicated_into_registry() {
        let h = harness();
        for address in ["AA:BB", "CC:DD", "AA:BB"] {
            h.transport_tx
                .send(TransportEvent::DeviceDiscovered {
                    address: DeviceAddress::from(address),
                    name: None,
                })
                .unwrap();
        }
        settle().await;

        let registry = lock(&h.registry);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().address.as_str(), "AA:BB");
        assert_eq!(registry.get(1).unwrap().address.as_str(), "CC:DD");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_event_advances_to_discovery() {
        let mut h = harness();
        lock(&h.session)
            .request_connect(h.transport.as_ref(), DeviceAddress::from("AA:BB"))
            .unwrap();

        h.transport_tx
            .send(TransportEvent::ConnectionChange(LinkState::Connected))
            .unwrap();
        settle().await;

        assert_eq!(
            lock(&h.session).state(),
            ConnectionState::ServiceDiscovering
        );
        assert_eq!(h.transport.count(|c| matches!(c, Call::DiscoverServices(_))), 1);
        // no outward notification until discovery completes
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discovery_success_notifies_and_starts_rssi_polling() {
        let mut h = harness();
        lock(&h.session)
            .request_connect(h.transport.as_ref(), DeviceAddress::from("AA:BB"))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ConnectionChange(LinkState::Connected))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ServicesDiscovered {
                status: GattStatus::Success,
                services: shield_services(),
            })
            .unwrap();
        settle().await;

        assert_eq!(
            h.events.try_recv(),
            Ok(SessionEvent::Connected(ConnectOutcome::Success))
        );
        assert!(lock(&h.session).is_connected());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(h.transport.count(|c| matches!(c, Call::ReadRssi(_))) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborting_dispatcher_stops_rssi_poller() {
        let h = harness();
        lock(&h.session)
            .request_connect(h.transport.as_ref(), DeviceAddress::from("AA:BB"))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ConnectionChange(LinkState::Connected))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ServicesDiscovered {
                status: GattStatus::Success,
                services: shield_services(),
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(h.transport.count(|c| matches!(c, Call::ReadRssi(_))) >= 1);

        // the session stays Ready, so only the abort can stop the poller
        h._dispatcher.abort();
        settle().await;
        let polls = h.transport.count(|c| matches!(c, Call::ReadRssi(_)));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(h.transport.count(|c| matches!(c, Call::ReadRssi(_))), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_before_ready_reports_connect_failure() {
        let mut h = harness();
        lock(&h.session)
            .request_connect(h.transport.as_ref(), DeviceAddress::from("AA:BB"))
            .unwrap();

        h.transport_tx
            .send(TransportEvent::ConnectionChange(LinkState::Disconnected))
            .unwrap();
        settle().await;

        assert_eq!(
            h.events.try_recv(),
            Ok(SessionEvent::Connected(ConnectOutcome::Failure))
        );
        assert_eq!(lock(&h.session).state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rx_update_overwrites_and_notifies() {
        let mut h = harness();
        lock(&h.session)
            .request_connect(h.transport.as_ref(), DeviceAddress::from("AA:BB"))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ConnectionChange(LinkState::Connected))
            .unwrap();
        h.transport_tx
            .send(TransportEvent::ServicesDiscovered {
                status: GattStatus::Success,
                services: shield_services(),
            })
            .unwrap();
        for payload in [vec![0x01u8, 0x02], vec![0x05]] {
            h.transport_tx
                .send(TransportEvent::CharacteristicUpdate {
                    uuid: protocol::SHIELD_RX_CHAR_UUID,
                    value: payload,
                })
                .unwrap();
        }
        settle().await;

        assert_eq!(
            h.events.try_recv(),
            Ok(SessionEvent::Connected(ConnectOutcome::Success))
        );
        assert_eq!(
            h.events.try_recv(),
            Ok(SessionEvent::DataReceived(vec![0x01, 0x02]))
        );
        assert_eq!(h.events.try_recv(), Ok(SessionEvent::DataReceived(vec![0x05])));
        assert_eq!(lock(&h.session).receive_latest(), vec![0x05]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_characteristic_updates_are_dropped() {
        let mut h = harness();
        h.transport_tx
            .send(TransportEvent::CharacteristicUpdate {
                uuid: uuid::uuid!("00000000-0000-0000-0000-00000000beef"),
                value: vec![0xff],
            })
            .unwrap();
        settle().await;

        assert!(h.events.try_recv().is_err());
        assert!(lock(&h.session).receive_latest().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rssi_results_surface_as_side_channel() {
        let mut h = harness();
        h.transport_tx
            .send(TransportEvent::RssiRead {
                status: GattStatus::Success,
                rssi: -61,
            })
            .unwrap();
        h.transport_tx
            .send(TransportEvent::RssiRead {
                status: GattStatus::Failure(1),
                rssi: 0,
            })
            .unwrap();
        settle().await;

        assert_eq!(h.events.try_recv(), Ok(SessionEvent::RssiUpdate(-61)));
        // failures are logged, never notified
        assert!(h.events.try_recv().is_err());
    }
}
