//! Domain layer: pure value types with no I/O.
//!
//! - **`pose`** – The (elbow, wrist) pair exchanged between nodes.
//! - **`boundary`** – The optional lower/upper elbow limits and the check the
//!   limiter runs on every poll.
//! - **`role`** – Master / follower.

pub mod boundary;
pub mod pose;
pub mod role;
