//! PublishPoseUseCase: the node's main loop.
//!
//! Every tick the local pose is sampled and, when session logging is on,
//! appended to the session log.  While this node is master, a pose that
//! differs from the last one sent is published to the peer as a `control`
//! message.  Unchanged poses are never re-sent, so a resting master produces
//! no traffic.
//!
//! A pose record that cannot be written is skipped with a warning; only the
//! first failure of a run of failures is logged.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use exo_core::protocol::timestamp_now;
use exo_core::{encode_message, JointPose, PeerMessage};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::application::drive_joints::JointRig;
use crate::application::fault::NodeError;
use crate::application::node_state::NodeState;
use crate::application::record_session::SessionRecorder;

/// Outbound half of the transport, as seen by the publisher.
#[async_trait]
pub trait PeerSender: Send + Sync {
    /// Sends one datagram to the configured peer.
    async fn send_to_peer(&self, datagram: &[u8]) -> std::io::Result<()>;
}

/// Shortest tick the publisher will run at.
const MIN_TICK: Duration = Duration::from_millis(1);

/// What one publisher tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The pose was sent to the peer.
    Published(JointPose),
    /// Master, but the pose has not changed since the last send.
    Unchanged,
    /// Follower; nothing is sent.
    NotMaster,
}

pub struct PublishPoseUseCase {
    state: Arc<NodeState>,
    rig: Arc<JointRig>,
    session: Arc<dyn SessionRecorder>,
    sender: Arc<dyn PeerSender>,
    interval: Duration,
    last_published: Option<JointPose>,
    records_failing: bool,
}

impl PublishPoseUseCase {
    pub fn new(
        state: Arc<NodeState>,
        rig: Arc<JointRig>,
        session: Arc<dyn SessionRecorder>,
        sender: Arc<dyn PeerSender>,
        interval: Duration,
    ) -> Self {
        Self {
            state,
            rig,
            session,
            sender,
            interval: interval.max(MIN_TICK),
            last_published: None,
            records_failing: false,
        }
    }

    /// Runs ticks until one fails.  Only returns on a fatal error.
    pub async fn run(mut self) -> NodeError {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("pose publisher started ({:?} per tick)", self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                return e;
            }
        }
    }

    /// One sample/record/publish step.
    ///
    /// # Errors
    ///
    /// Device faults and send failures are fatal and returned as
    /// [`NodeError`].
    pub async fn tick(&mut self) -> Result<TickOutcome, NodeError> {
        let pose = self.rig.run_blocking(JointRig::read_pose).await?;
        let timestamp = timestamp_now();

        if self.session.is_active() {
            self.record(&timestamp, pose);
        }

        if !self.state.role().is_master() {
            return Ok(TickOutcome::NotMaster);
        }
        if self.last_published == Some(pose) {
            return Ok(TickOutcome::Unchanged);
        }

        let datagram = match encode_message(&PeerMessage::control(pose, timestamp)) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Only a non-finite reading gets here; skip it and try again
                // next tick.
                warn!("not publishing pose {pose:?}: {e}");
                return Ok(TickOutcome::Unchanged);
            }
        };
        self.sender
            .send_to_peer(&datagram)
            .await
            .map_err(NodeError::Transport)?;
        trace!("published elbow={} wrist={}", pose.elbow, pose.wrist);
        self.last_published = Some(pose);
        Ok(TickOutcome::Published(pose))
    }

    fn record(&mut self, timestamp: &str, pose: JointPose) {
        match self.session.record_pose(timestamp, pose) {
            Ok(()) => {
                if self.records_failing {
                    info!("session log writes resumed");
                }
                self.records_failing = false;
            }
            Err(e) => {
                if !self.records_failing {
                    warn!("pose records are being skipped: {e}");
                }
                self.records_failing = true;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
