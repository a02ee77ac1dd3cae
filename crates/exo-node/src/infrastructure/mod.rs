//! Infrastructure layer for an exo-sync node.
//!
//! Contains the adapters behind the application ports: the UDP transport,
//! actuator devices, the session log files, and TOML configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and `exo_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod actuators;
pub mod network;
pub mod session_log;
pub mod storage;
