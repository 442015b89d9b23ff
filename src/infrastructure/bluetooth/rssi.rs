//! Periodic signal-strength sampling while connected.
//!
//! The dispatcher spawns one poller per entry into `Ready`. Each tick checks
//! the session state under the shared lock and exits as soon as the state has
//! left `Ready`, so teardown is observed within one polling interval. Read
//! results come back through the transport event channel like every other
//! asynchronous outcome.

use crate::domain::models::ConnectionState;
use crate::infrastructure::bluetooth::gatt::GattSession;
use crate::infrastructure::bluetooth::lock;
use crate::infrastructure::transport::BleTransport;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

pub fn spawn_poller(
    transport: Arc<dyn BleTransport>,
    session: Arc<Mutex<GattSession>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(interval_ms = interval.as_millis() as u64, "rssi poller started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let guard = lock(&session);
            if guard.state() != ConnectionState::Ready {
                break;
            }
            if let Some(handle) = guard.handle() {
                if let Err(e) = transport.read_remote_rssi(handle) {
                    // a failed read never alters connection state
                    warn!(error = %e, "rssi read request failed");
                }
            }
        }
        debug!("rssi poller stopped");
    })
}
