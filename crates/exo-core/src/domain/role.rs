//! Node role.

use std::fmt;

/// Whether this node is currently the motion source or the motion sink.
///
/// The role is commanded by the peer with a `master <true|false>` message.
/// There is no election: both nodes may briefly believe they are master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Publishes its live pose to the peer.
    Master,
    /// Applies motion targets received from the peer.
    #[default]
    Follower,
}

impl Role {
    /// Maps the boolean carried by `master <bool>` to a role.
    pub fn from_master_flag(is_master: bool) -> Self {
        if is_master {
            Role::Master
        } else {
            Role::Follower
        }
    }

    pub fn is_master(self) -> bool {
        matches!(self, Role::Master)
    }

    /// Short tag used in session log file names.
    pub fn log_tag(self) -> &'static str {
        match self {
            Role::Master => "host",
            Role::Follower => "follower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Master => f.write_str("master"),
            Role::Follower => f.write_str("follower"),
        }
    }
}
