//! Fatal node errors and the channel used to surface them.
//!
//! The receive loop returns its fatal error directly and the publisher task
//! returns its own through its join handle.  The limiter and the actuation
//! worker run detached, so they hand theirs to a [`FaultReporter`]; the
//! node's supervisor waits on all of these and runs the same actuator cleanup
//! whichever activity failed first.
//!
//! Session log problems are never fatal.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::error;

use crate::application::drive_joints::DeviceError;

/// An error that stops the node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The actuator device failed during steady-state operation.
    #[error("device fault: {0}")]
    Device(#[from] DeviceError),

    /// The UDP endpoint failed.
    #[error("transport fault: {0}")]
    Transport(#[source] std::io::Error),

    /// A node task panicked or was cancelled.
    #[error("node task failed: {0}")]
    Task(#[from] JoinError),

    /// The actuation worker exited while the node was still running.
    #[error("actuation worker stopped unexpectedly")]
    WorkerStopped,
}

const FAULT_QUEUE_DEPTH: usize = 8;

/// Cloneable handle that detached activities use to report a fatal error.
#[derive(Clone)]
pub struct FaultReporter {
    tx: mpsc::Sender<NodeError>,
}

impl FaultReporter {
    /// Creates a reporter and the receiver the supervisor waits on.
    pub fn channel() -> (Self, mpsc::Receiver<NodeError>) {
        let (tx, rx) = mpsc::channel(FAULT_QUEUE_DEPTH);
        (Self { tx }, rx)
    }

    /// Logs `fault` and forwards it to the supervisor.
    ///
    /// Only the first fault matters for shutdown, so a full queue or a
    /// supervisor that already exited drops the report.
    pub fn report(&self, source: &'static str, fault: NodeError) {
        error!("{source}: {fault}");
        let _ = self.tx.try_send(fault);
    }
}
