//! HandleMessageUseCase: applies one decoded peer message to the node.
//!
//! | Message             | Effect                                                   |
//! |---------------------|----------------------------------------------------------|
//! | `control`           | queue the motion target (accepted in either role)        |
//! | `repeat false`      | release every actuator                                   |
//! | `master true/false` | set the role; becoming (or staying) master releases all  |
//! | `border ...`        | set a bound, start the limiter (master only), stop it    |
//! | `log <name>`        | switch the session log file                              |
//! | `sequence ...`      | append the raw text to the session log                   |
//!
//! Device faults are returned to the receive loop, which treats them as
//! fatal.  Session log problems are logged and otherwise ignored: losing a
//! log file must not stop the rig.

use std::sync::Arc;

use exo_core::{BorderCommand, PeerMessage, Role};
use tracing::{info, warn};

use crate::application::dispatch_actuation::{ActuationDispatcher, DispatchOutcome, MotionTarget};
use crate::application::drive_joints::JointRig;
use crate::application::enforce_boundary::BoundaryLimiter;
use crate::application::fault::NodeError;
use crate::application::node_state::{BorderEnable, NodeState};
use crate::application::record_session::{SessionLogError, SessionRecorder};

/// Applies decoded peer messages to the node's state and actuators.
pub struct HandleMessageUseCase {
    state: Arc<NodeState>,
    rig: Arc<JointRig>,
    dispatcher: ActuationDispatcher,
    limiter: Arc<BoundaryLimiter>,
    session: Arc<dyn SessionRecorder>,
}

impl HandleMessageUseCase {
    pub fn new(
        state: Arc<NodeState>,
        rig: Arc<JointRig>,
        dispatcher: ActuationDispatcher,
        limiter: Arc<BoundaryLimiter>,
        session: Arc<dyn SessionRecorder>,
    ) -> Self {
        Self {
            state,
            rig,
            dispatcher,
            limiter,
            session,
        }
    }

    /// Applies `msg`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Device`] if releasing actuators fails, or
    /// [`NodeError::WorkerStopped`] if the actuation worker is gone.
    pub async fn handle(&self, msg: PeerMessage) -> Result<(), NodeError> {
        match msg {
            PeerMessage::Control(control) => self.handle_control(MotionTarget::from(control)),
            PeerMessage::Repeat { enabled } => {
                info!("message received: repeat {enabled}");
                if !enabled {
                    self.rig.run_blocking(JointRig::release_all).await?;
                }
                Ok(())
            }
            PeerMessage::SetMaster { enabled } => self.handle_set_master(enabled).await,
            PeerMessage::SetBorder(cmd) => {
                self.handle_border(cmd);
                Ok(())
            }
            PeerMessage::SwitchLog { name } => {
                if self.session.is_active() {
                    info!("switching session log to {name}");
                    let role = self.state.role();
                    log_failure(self.session.switch_destination(&name, role));
                }
                Ok(())
            }
            PeerMessage::SequenceMarker { raw_text } => {
                if self.session.is_active() {
                    info!("sequence marker: {raw_text}");
                    log_failure(self.session.record_marker(&raw_text));
                }
                Ok(())
            }
        }
    }

    fn handle_control(&self, target: MotionTarget) -> Result<(), NodeError> {
        match self.dispatcher.dispatch(target) {
            DispatchOutcome::Queued | DispatchOutcome::Dropped => Ok(()),
            DispatchOutcome::WorkerStopped => Err(NodeError::WorkerStopped),
        }
    }

    async fn handle_set_master(&self, enabled: bool) -> Result<(), NodeError> {
        info!("message received: master {enabled}");
        let role = Role::from_master_flag(enabled);
        self.state.set_role(role);
        if role.is_master() {
            // A node drives its rig either from the operator (master) or from
            // the peer (follower), never both.
            self.rig.run_blocking(JointRig::release_all).await?;
        }
        let note = match role {
            Role::Master => "Switched to being master",
            Role::Follower => "Switched to being follower",
        };
        log_failure(self.session.note(note));
        Ok(())
    }

    fn handle_border(&self, cmd: BorderCommand) {
        info!("message received: border {cmd:?}");
        match cmd {
            BorderCommand::Upper(v) => {
                self.state.set_upper_bound(v);
                log_failure(self.session.note(&format!("upper border set to {v}")));
            }
            BorderCommand::Lower(v) => {
                self.state.set_lower_bound(v);
                log_failure(self.session.note(&format!("lower border set to {v}")));
            }
            BorderCommand::Enable => {
                let (outcome, _handle) = self.limiter.enable();
                if matches!(outcome, BorderEnable::Started { .. }) {
                    log_failure(self.session.note("border mode enabled"));
                }
            }
            BorderCommand::Disable => {
                self.limiter.disable();
                log_failure(self.session.note("border mode disabled"));
            }
        }
    }
}

fn log_failure(result: Result<(), SessionLogError>) {
    if let Err(e) = result {
        warn!("session log write skipped: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
