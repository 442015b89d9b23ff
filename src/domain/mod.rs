//! Domain layer: device identities, session states, events, and configuration.

pub mod error;
pub mod models;
pub mod registry;
pub mod settings;
