//! Error taxonomy for the public session API.

use crate::infrastructure::transport::TransportError;
use thiserror::Error;

/// Errors returned by the synchronous session API.
///
/// These cover request acceptance only; asynchronous failures (connect
/// timeout, peer-initiated disconnect, discovery failure) are reported
/// through [`SessionEvent`](crate::domain::models::SessionEvent)
/// notifications instead.
#[derive(Debug, Error)]
pub enum BleError {
    /// No BLE hardware, or the adapter is disabled. Short-circuits before
    /// any transport interaction.
    #[error("bluetooth adapter unavailable or disabled")]
    AdapterUnavailable,

    /// The given device reference does not resolve to a discovered device.
    #[error("unknown device address: {0}")]
    InvalidAddress(String),

    /// A connect sequence is already in flight for a different address.
    /// Requests are rejected, never queued.
    #[error("another connection is already in progress")]
    Busy,

    /// The operation requires the session to be `Ready` with a registered
    /// RX characteristic.
    #[error("session is not ready")]
    NotReady,

    /// The underlying BLE stack refused the request.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
