//! State shared by every concurrent activity of a node.
//!
//! Four activities touch this state: the receive loop (writes role, bounds
//! and the limiter flag), the publisher (reads the role), the boundary
//! limiter (reads bounds and its own flag) and the actuation worker (none).
//!
//! - Role and the limiter flag are single atomics; readers may observe a
//!   change one poll late, which every loop tolerates.
//! - The (lower, upper) pair sits behind one `RwLock` so a reader never sees
//!   half of an update.
//! - Each successful enable bumps the limiter epoch.  A limiter loop keeps
//!   running only while the flag is set *and* its epoch is current, so a fast
//!   disable/enable pair leaves exactly one loop alive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use exo_core::{Boundary, Role};

/// Result of asking the node to start boundary enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderEnable {
    /// Enforcement was off and is now on; a limiter loop must be started
    /// with this epoch.
    Started { epoch: u64 },
    /// Enforcement was already running; nothing changes.
    AlreadyEnabled,
    /// Only a master enforces boundaries; the request is ignored.
    NotMaster,
}

/// Role, boundary and limiter flags of one node.
#[derive(Debug, Default)]
pub struct NodeState {
    is_master: AtomicBool,
    border_enabled: AtomicBool,
    limiter_epoch: AtomicU64,
    boundary: RwLock<Boundary>,
}

impl NodeState {
    /// Creates a follower with no bounds and the limiter disabled.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn role(&self) -> Role {
        Role::from_master_flag(self.is_master.load(Ordering::Acquire))
    }

    /// Sets the role and returns the previous one.
    pub fn set_role(&self, role: Role) -> Role {
        let was_master = self.is_master.swap(role.is_master(), Ordering::AcqRel);
        Role::from_master_flag(was_master)
    }

    /// Consistent snapshot of both bounds.
    pub fn boundary(&self) -> Boundary {
        *self.boundary.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_upper_bound(&self, upper: f64) {
        self.boundary
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .upper = Some(upper);
    }

    pub fn set_lower_bound(&self, lower: f64) {
        self.boundary
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .lower = Some(lower);
    }

    pub fn border_enabled(&self) -> bool {
        self.border_enabled.load(Ordering::Acquire)
    }

    /// Turns boundary enforcement on if this node is master and it is off.
    pub fn try_enable_border(&self) -> BorderEnable {
        if !self.role().is_master() {
            return BorderEnable::NotMaster;
        }
        match self
            .border_enabled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let epoch = self.limiter_epoch.fetch_add(1, Ordering::AcqRel) + 1;
                BorderEnable::Started { epoch }
            }
            Err(_) => BorderEnable::AlreadyEnabled,
        }
    }

    /// Turns boundary enforcement off.  Returns `true` if it was on.
    pub fn disable_border(&self) -> bool {
        self.border_enabled.swap(false, Ordering::AcqRel)
    }

    /// Whether the limiter loop started with `epoch` should keep running.
    pub fn limiter_should_run(&self, epoch: u64) -> bool {
        self.border_enabled() && self.limiter_epoch.load(Ordering::Acquire) == epoch
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
