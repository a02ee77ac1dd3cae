//! Boundary limiter: keeps the elbow inside [lower, upper] on the master.
//!
//! While enabled, the limiter polls the elbow at a fixed interval.  When the
//! reading is outside the configured range it drives both elbow actuators
//! back to the violated bound, lets them settle, and releases them so the
//! operator is free to move again.  Polling (rather than reacting to every
//! pose update) keeps actuator traffic low at the cost of one interval of
//! latency.
//!
//! Only a master may start the limiter; anyone may stop it.  A running loop
//! notices it has been stopped at its next poll.

use std::sync::Arc;
use std::time::Duration;

use exo_core::BoundCheck;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::application::drive_joints::{DeviceError, JointRig};
use crate::application::fault::{FaultReporter, NodeError};
use crate::application::node_state::{BorderEnable, NodeState};

/// Poll and settle intervals of the limiter loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterTiming {
    /// Delay between two elbow readings.
    pub poll_interval: Duration,
    /// How long the elbow is held at the bound before it is released.
    pub settle: Duration,
}

impl Default for LimiterTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            settle: Duration::from_millis(100),
        }
    }
}

/// Starts, stops and runs the boundary enforcement loop.
pub struct BoundaryLimiter {
    state: Arc<NodeState>,
    rig: Arc<JointRig>,
    timing: LimiterTiming,
    faults: FaultReporter,
}

impl BoundaryLimiter {
    pub fn new(
        state: Arc<NodeState>,
        rig: Arc<JointRig>,
        timing: LimiterTiming,
        faults: FaultReporter,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            rig,
            timing,
            faults,
        })
    }

    /// Enables enforcement and spawns the loop if this node is master and
    /// enforcement was off.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enable(self: &Arc<Self>) -> (BorderEnable, Option<JoinHandle<()>>) {
        let outcome = self.state.try_enable_border();
        let handle = match outcome {
            BorderEnable::Started { epoch } => {
                info!("boundary limiter enabled");
                Some(tokio::spawn(Arc::clone(self).run(epoch)))
            }
            BorderEnable::AlreadyEnabled => {
                debug!("boundary limiter already running");
                None
            }
            BorderEnable::NotMaster => {
                info!("ignoring border enable: only a master enforces boundaries");
                None
            }
        };
        (outcome, handle)
    }

    /// Disables enforcement.  Returns `true` if it was running.
    pub fn disable(&self) -> bool {
        let was_enabled = self.state.disable_border();
        if was_enabled {
            info!("boundary limiter disabled");
        }
        was_enabled
    }

    /// The limiter loop.  Exits when disabled, superseded, or on a device
    /// fault (which is reported as fatal).
    pub async fn run(self: Arc<Self>, epoch: u64) {
        while self.state.limiter_should_run(epoch) {
            if let Err(e) = self.poll_once().await {
                self.state.disable_border();
                self.faults.report("boundary limiter", NodeError::Device(e));
                return;
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
        debug!("boundary limiter loop {epoch} exited");
    }

    /// One limiter step: read, compare, clamp if needed.
    pub async fn poll_once(&self) -> Result<BoundCheck, DeviceError> {
        let elbow = self.rig.run_blocking(JointRig::read_elbow).await?;
        let boundary = self.state.boundary();
        let check = boundary.check(elbow);
        trace!(
            "elbow {elbow}, lower {:?}, upper {:?}",
            boundary.lower,
            boundary.upper
        );

        if let Some(bound) = check.clamp_target() {
            debug!("elbow {elbow} outside boundary; driving back to {bound}");
            self.rig
                .run_blocking(move |rig| rig.command_elbow(bound))
                .await?;
            tokio::time::sleep(self.timing.settle).await;
            self.rig.run_blocking(JointRig::release_elbow).await?;
        }
        Ok(check)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
