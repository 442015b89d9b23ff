//! Well-known GATT identifiers for the supported peripheral.
//!
//! The session manager targets a single serial-bridge style service: one
//! service UUID and one RX characteristic that is both the notification
//! source and the write target. Defaults match the RedBear BLE shield family;
//! embedders can override both through
//! [`SessionConfig`](crate::domain::settings::SessionConfig).

use uuid::{uuid, Uuid};

/// Service resolved after discovery.
pub const SHIELD_SERVICE_UUID: Uuid = uuid!("713d0000-503e-4c75-ba94-3148f18d941e");

/// RX characteristic: subscribed for notifications and written by `send`.
pub const SHIELD_RX_CHAR_UUID: Uuid = uuid!("713d0002-503e-4c75-ba94-3148f18d941e");
