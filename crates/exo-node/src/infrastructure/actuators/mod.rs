//! Actuator device adapters.
//!
//! - `recording` keeps every call in memory; integration tests use it to
//!   observe what a node did to its rig.
//! - `simulated` behaves like a rig whose motors reach their targets
//!   instantly; the binary runs on it when no hardware driver is linked.

pub mod recording;
pub mod simulated;

pub use recording::RecordingActuatorDevice;
pub use simulated::SimulatedActuatorDevice;
