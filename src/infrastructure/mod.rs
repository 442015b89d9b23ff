//! Infrastructure layer: transport abstraction, session machinery, logging.

pub mod bluetooth;
pub mod logging;
pub mod transport;
