//! Application layer use cases for an exo-sync node.
//!
//! # What use cases does a node have?
//!
//! - **`node_state`** – The role, boundary and limiter flags shared by every
//!   concurrent activity of the node.
//!
//! - **`drive_joints`** – The [`drive_joints::ActuatorDevice`] port and the
//!   [`drive_joints::JointRig`] that maps elbow/wrist angles onto the three
//!   physical actuators.
//!
//! - **`dispatch_actuation`** – Moves incoming motion targets off the receive
//!   path onto a bounded queue drained by one actuation worker.
//!
//! - **`enforce_boundary`** – The limiter loop that drives the elbow back
//!   inside its configured travel range.
//!
//! - **`handle_message`** – Applies one decoded peer message to the node.
//!
//! - **`publish_pose`** – The main loop: samples the local pose, records it,
//!   and publishes changes to the peer while this node is master.
//!
//! - **`record_session`** – The session log port used by the publisher and
//!   the message handler.
//!
//! - **`fault`** – The fatal error type and the channel every activity uses
//!   to report it to the top-level cleanup.

pub mod dispatch_actuation;
pub mod drive_joints;
pub mod enforce_boundary;
pub mod fault;
pub mod handle_message;
pub mod node_state;
pub mod publish_pose;
pub mod record_session;
