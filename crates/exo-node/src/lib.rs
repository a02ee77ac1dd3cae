//! exo-node library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! A node runs on one exoskeleton rig.  It listens for datagrams from its
//! single peer and, depending on its role, either publishes the local joint
//! angles (master) or drives its actuators to the angles it receives
//! (follower).  While master it can also keep the elbow inside a configured
//! travel range.

/// Application layer: use cases and the ports they depend on.
pub mod application;

/// Infrastructure layer: UDP transport, actuator devices, session log files,
/// and configuration.
pub mod infrastructure;

/// Wiring of the use cases into a running node.
pub mod node;

pub use node::Node;
