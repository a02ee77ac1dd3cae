//! # exo-core
//!
//! Shared library for exo-sync containing the peer wire protocol and the
//! joint-level domain types.
//!
//! This crate is used by every node.  It has zero dependencies on sockets,
//! actuator drivers, or the filesystem.
//!
//! # Architecture overview
//!
//! exo-sync links two exoskeleton rigs ("nodes") over UDP.  One node is the
//! *master*: its operator moves the joints and the node publishes the angles.
//! The other is the *follower*: it receives those angles and drives its own
//! actuators to match.  Roles are commanded by the peer, never negotiated.
//!
//! - **`protocol`** – The text datagram format (`control,...`, `master true`,
//!   `border upper 12.5`, ...) and the codec that turns datagrams into typed
//!   [`PeerMessage`]s and back.
//!
//! - **`domain`** – Pure value types: the [`JointPose`] published between
//!   nodes, the [`Boundary`] the safety limiter enforces, and the node
//!   [`Role`].

pub mod domain;
pub mod protocol;

pub use domain::boundary::{BoundCheck, Boundary};
pub use domain::pose::JointPose;
pub use domain::role::Role;
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::{BorderCommand, ControlMessage, PeerMessage};
