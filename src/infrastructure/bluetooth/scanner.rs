//! Time-bounded BLE device discovery.
//!
//! A scan session clears the device registry, starts the transport scan, and
//! hands the duration timer to a spawned task. That task owns the stop: the
//! transport scan is halted and `ScanComplete` emitted exactly once per
//! session, whether the window elapses or the caller cancels early, and
//! whether or not anyone polls for completion.

use crate::domain::error::BleError;
use crate::domain::models::SessionEvent;
use crate::domain::registry::DeviceRegistry;
use crate::infrastructure::bluetooth::lock;
use crate::infrastructure::transport::BleTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub struct ScanController {
    transport: Arc<dyn BleTransport>,
    registry: Arc<Mutex<DeviceRegistry>>,
    notify: mpsc::UnboundedSender<SessionEvent>,
    scanning: Arc<AtomicBool>,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl ScanController {
    pub fn new(
        transport: Arc<dyn BleTransport>,
        registry: Arc<Mutex<DeviceRegistry>>,
        notify: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            transport,
            registry,
            notify,
            scanning: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(None),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Begin a discovery window of `duration`. Must run inside a Tokio
    /// runtime. A scan already in progress makes this a no-op.
    pub fn start(&self, duration: Duration) -> Result<(), BleError> {
        if !self.transport.adapter_available() {
            warn!("scan refused: adapter unavailable");
            return Err(BleError::AdapterUnavailable);
        }
        if self.scanning.swap(true, Ordering::SeqCst) {
            warn!("scan already in progress, ignoring start");
            return Ok(());
        }

        lock(&self.registry).clear();

        if let Err(e) = self.transport.start_scan() {
            self.scanning.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        info!(duration_ms = duration.as_millis() as u64, "scan started");

        let (cancel_tx, cancel_rx) = oneshot::channel();
        *lock(&self.cancel) = Some(cancel_tx);

        let transport = self.transport.clone();
        let registry = self.registry.clone();
        let notify = self.notify.clone();
        let scanning = self.scanning.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = cancel_rx => debug!("scan cancelled early"),
            }
            if let Err(e) = transport.stop_scan() {
                warn!(error = %e, "failed to stop transport scan");
            }
            scanning.store(false, Ordering::SeqCst);
            info!(found = lock(&registry).len(), "scan complete");
            let _ = notify.send(SessionEvent::ScanComplete);
        });

        Ok(())
    }

    /// Cancel an in-progress scan. Idempotent; the timer task still stops the
    /// transport scan and emits the completion notification.
    pub fn stop(&self) {
        if let Some(cancel) = lock(&self.cancel).take() {
            let _ = cancel.send(());
        }
    }
}
