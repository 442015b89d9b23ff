//! BLE central-role session machinery.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    BleSessionManager                     │
//! │   (Session facade - public API for the embedding host)   │
//! └──────┬──────────────┬──────────────────────┬─────────────┘
//!        │              │                      │
//!        ▼              ▼                      ▼
//! ┌────────────┐  ┌───────────┐        ┌──────────────┐
//! │   Scan     │  │   GATT    │◄───────│    Event     │
//! │ Controller │  │  Session  │        │  Dispatcher  │
//! │            │  │           │        │              │
//! │ - timed    │  │ - state   │        │ - transport  │
//! │   window   │  │   machine │        │   event loop │
//! │ - registry │  │ - rx path │        │ - rssi spawn │
//! └────────────┘  └───────────┘        └──────────────┘
//! ```
//!
//! Transport callbacks arrive on an mpsc channel; the dispatcher is its only
//! consumer, so state transitions apply sequentially in emission order. The
//! GATT session (state, characteristic table, rx buffer, connection handle)
//! sits behind one mutex shared by the facade and the dispatcher.
//!
//! ## Modules
//!
//! - [`protocol`] - well-known service/characteristic identifiers
//! - [`scanner`] - time-bounded device discovery
//! - [`gatt`] - connection state machine and data path
//! - [`dispatcher`] - transport event loop
//! - [`rssi`] - periodic signal-strength sampling
//! - [`service`] - session facade

pub mod dispatcher;
pub mod gatt;
pub mod protocol;
pub mod rssi;
pub mod scanner;
pub mod service;

pub use service::BleSessionManager;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock that survives a poisoned mutex: transitions are atomic per lock hold,
/// so the state stays coherent even if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
