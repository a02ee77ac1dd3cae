//! A running node: the receive loop, the pose publisher, the boundary
//! limiter and the actuation worker, plus the cleanup they all share.
//!
//! ```text
//! Node::run()
//!  ├─ receive loop      UdpTransport -> decode -> HandleMessageUseCase
//!  ├─ publisher task    JointRig -> SessionLog / UdpTransport
//!  ├─ fault channel     BoundaryLimiter, ActuationWorker
//!  └─ shutdown future   (Ctrl-C in the binary)
//!        │ first to finish
//!        ▼
//!  cleanup: stop publisher and limiter, drain worker, release actuators,
//!           power off
//! ```
//!
//! Every device call runs on Tokio's blocking pool, so the receive loop keeps
//! handling datagrams while the publisher or limiter waits on the bus.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use exo_core::decode_message;
use exo_core::protocol::MAX_DATAGRAM_SIZE;
use tracing::{error, info, trace, warn};

use crate::application::dispatch_actuation::ActuationDispatcher;
use crate::application::drive_joints::{Actuator, JointRig};
use crate::application::enforce_boundary::BoundaryLimiter;
use crate::application::fault::{FaultReporter, NodeError};
use crate::application::handle_message::HandleMessageUseCase;
use crate::application::node_state::NodeState;
use crate::application::publish_pose::{PeerSender, PublishPoseUseCase};
use crate::application::record_session::SessionRecorder;
use crate::infrastructure::network::{NodeIdentity, TransportError, UdpTransport};
use crate::infrastructure::storage::config::TimingConfig;

/// Upper bound on how long cleanup waits for queued targets to be applied.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Node {
    identity: NodeIdentity,
    timing: TimingConfig,
    state: Arc<NodeState>,
    rig: Arc<JointRig>,
    session: Arc<dyn SessionRecorder>,
    transport: Arc<UdpTransport>,
}

impl Node {
    /// Binds the transport.  Nothing runs until [`Node::run`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the local endpoint cannot be
    /// bound.
    pub async fn bind(
        identity: NodeIdentity,
        timing: TimingConfig,
        rig: Arc<JointRig>,
        session: Arc<dyn SessionRecorder>,
    ) -> Result<Self, TransportError> {
        let transport = Arc::new(UdpTransport::bind(&identity).await?);
        Ok(Self {
            identity,
            timing,
            state: NodeState::new(),
            rig,
            session,
            transport,
        })
    }

    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs every activity until the first fatal fault or until `shutdown`
    /// completes, then releases the rig.
    ///
    /// Returns `Ok(())` on a requested shutdown and the fault otherwise.  The
    /// rig is cleaned up in both cases.
    pub async fn run<F>(self, shutdown: F) -> Result<(), NodeError>
    where
        F: Future<Output = ()>,
    {
        let (faults, mut fault_rx) = FaultReporter::channel();

        let (dispatcher, worker) =
            ActuationDispatcher::new(Arc::clone(&self.rig), self.timing.actuation_queue_depth);
        let worker = worker.spawn(faults.clone());

        let limiter = BoundaryLimiter::new(
            Arc::clone(&self.state),
            Arc::clone(&self.rig),
            self.timing.limiter(),
            faults,
        );
        let handler = HandleMessageUseCase::new(
            Arc::clone(&self.state),
            Arc::clone(&self.rig),
            dispatcher,
            Arc::clone(&limiter),
            Arc::clone(&self.session),
        );
        let publisher = PublishPoseUseCase::new(
            Arc::clone(&self.state),
            Arc::clone(&self.rig),
            Arc::clone(&self.session),
            Arc::clone(&self.transport) as Arc<dyn PeerSender>,
            self.timing.publish_interval(),
        );
        let mut publisher = tokio::spawn(publisher.run());

        info!(
            "{} running as {}, peer {}",
            self.identity.node_name,
            self.state.role(),
            self.transport.peer()
        );

        let outcome = tokio::select! {
            fault = receive_loop(&self.transport, &handler) => Err(fault),
            joined = &mut publisher => Err(joined.unwrap_or_else(NodeError::from)),
            Some(fault) = fault_rx.recv() => Err(fault),
            () = shutdown => {
                info!("shutdown requested");
                Ok(())
            }
        };

        if let Err(e) = &outcome {
            error!("stopping on fatal fault: {e}");
        }

        // Stop feeding the rig before releasing it.
        publisher.abort();
        limiter.disable();
        drop(handler);
        if tokio::time::timeout(WORKER_DRAIN_TIMEOUT, worker).await.is_err() {
            warn!("actuation worker still busy after {WORKER_DRAIN_TIMEOUT:?}");
        }
        match self.rig.run_blocking(JointRig::shutdown).await {
            Ok(()) => info!("actuators released and powered off"),
            Err(e) => error!("actuator cleanup failed: {e}"),
        }
        outcome
    }
}

/// Receives, decodes and applies peer datagrams.  Only returns on a fatal
/// error.
async fn receive_loop(transport: &UdpTransport, handler: &HandleMessageUseCase) -> NodeError {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let len = match transport.recv_from_peer(&mut buf).await {
            Ok(len) => len,
            Err(e) => return NodeError::Transport(e),
        };
        match decode_message(&buf[..len]) {
            Ok(msg) => {
                trace!("applying {} message", msg.keyword());
                if let Err(e) = handler.handle(msg).await {
                    return e;
                }
            }
            Err(e) => trace!("dropping datagram: {e}"),
        }
    }
}

/// Zeroes every encoder and logs the readings that follow.
///
/// Runs once before the node starts.  A fault here is logged and otherwise
/// ignored; the node starts with whatever the encoders report.
pub fn reset_encoders_at_startup(rig: &JointRig) {
    if let Err(e) = rig.reset_encoders() {
        warn!("encoder reset failed, continuing: {e}");
    }
    match rig.read_encoders() {
        Ok(readings) => {
            for (actuator, value) in Actuator::ALL.iter().zip(readings) {
                info!("initial reading {actuator}: {value}");
            }
        }
        Err(e) => warn!("could not read initial encoder positions: {e}"),
    }
}
