//! Actuation dispatch: applies peer motion targets off the receive path.
//!
//! The receive loop must never wait on actuator I/O, so every `control`
//! message becomes a [`MotionTarget`] pushed onto a bounded queue.  A single
//! [`ActuationWorker`] drains the queue on a blocking thread and drives the
//! rig.  Targets are applied in arrival order; when the queue is full the new
//! target is dropped, since the next control message supersedes it anyway.

use std::sync::Arc;

use exo_core::{ControlMessage, JointPose};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::application::drive_joints::JointRig;
use crate::application::fault::{FaultReporter, NodeError};

/// A motion target extracted from one `control` message.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionTarget {
    pub pose: JointPose,
    /// Sender timestamp, kept for diagnostics only.
    pub timestamp: String,
}

impl From<ControlMessage> for MotionTarget {
    fn from(msg: ControlMessage) -> Self {
        Self {
            pose: msg.pose(),
            timestamp: msg.timestamp,
        }
    }
}

/// What happened to a dispatched target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// The queue was full; the target was discarded.
    Dropped,
    /// The worker is gone; the target was discarded.
    WorkerStopped,
}

/// Sending half of the actuation queue, owned by the message handler.
pub struct ActuationDispatcher {
    tx: mpsc::Sender<MotionTarget>,
}

/// Receiving half of the actuation queue.
pub struct ActuationWorker {
    rx: mpsc::Receiver<MotionTarget>,
    rig: Arc<JointRig>,
}

impl ActuationDispatcher {
    /// Creates a dispatcher with a queue of `depth` pending targets and the
    /// worker that drains it.  The worker does nothing until spawned.
    pub fn new(rig: Arc<JointRig>, depth: usize) -> (Self, ActuationWorker) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, ActuationWorker { rx, rig })
    }

    /// Queues a target without waiting.
    pub fn dispatch(&self, target: MotionTarget) -> DispatchOutcome {
        match self.tx.try_send(target) {
            Ok(()) => DispatchOutcome::Queued,
            Err(TrySendError::Full(target)) => {
                warn!("actuation queue full; dropping target from {}", target.timestamp);
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(_)) => DispatchOutcome::WorkerStopped,
        }
    }
}

impl ActuationWorker {
    /// Runs the worker on Tokio's blocking pool.
    ///
    /// The worker exits when every dispatcher has been dropped, or after the
    /// first device fault, which it reports through `faults`.
    pub fn spawn(self, faults: FaultReporter) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run(&faults))
    }

    fn run(mut self, faults: &FaultReporter) {
        debug!("actuation worker started");
        while let Some(target) = self.rx.blocking_recv() {
            trace!(
                "applying target elbow={} wrist={} ({})",
                target.pose.elbow,
                target.pose.wrist,
                target.timestamp
            );
            if let Err(e) = self.rig.command_pose(target.pose) {
                faults.report("actuation worker", NodeError::Device(e));
                return;
            }
        }
        debug!("actuation worker stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::drive_joints::{Actuator, DeviceError, MockActuatorDevice};
    use mockall::predicate::eq;

    fn target(elbow: f64, wrist: f64) -> MotionTarget {
        MotionTarget {
            pose: JointPose::new(elbow, wrist),
            timestamp: "12:00:00.000000".into(),
        }
    }

    #[test]
    fn test_motion_target_from_control_message() {
        let msg = ControlMessage {
            elbow: 1.0,
            wrist: 2.0,
            timestamp: "t".into(),
        };
        assert_eq!(MotionTarget::from(msg), MotionTarget {
            pose: JointPose::new(1.0, 2.0),
            timestamp: "t".into(),
        });
    }

    #[test]
    fn test_full_queue_drops_new_target() {
        // Arrange – worker never spawned, so nothing drains the queue
        let rig = Arc::new(JointRig::new(Arc::new(MockActuatorDevice::new())));
        let (dispatcher, _worker) = ActuationDispatcher::new(rig, 2);

        // Act
        let outcomes: Vec<_> = (0..3).map(|i| dispatcher.dispatch(target(i as f64, 0.0))).collect();

        // Assert
        assert_eq!(
            outcomes,
            vec![DispatchOutcome::Queued, DispatchOutcome::Queued, DispatchOutcome::Dropped]
        );
    }

    #[test]
    fn test_dispatch_after_worker_dropped_reports_stopped() {
        let rig = Arc::new(JointRig::new(Arc::new(MockActuatorDevice::new())));
        let (dispatcher, worker) = ActuationDispatcher::new(rig, 4);
        drop(worker);

        assert_eq!(dispatcher.dispatch(target(0.0, 0.0)), DispatchOutcome::WorkerStopped);
    }

    #[tokio::test]
    async fn test_worker_applies_targets_in_order() {
        // Arrange
        let mut device = MockActuatorDevice::new();
        let mut seq = mockall::Sequence::new();
        for (elbow, wrist) in [(10.0, 5.0), (11.0, 6.0)] {
            device
                .expect_set_target()
                .with(eq(Actuator::ElbowA), eq(-elbow))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(Ok(()));
            device
                .expect_set_target()
                .with(eq(Actuator::ElbowC), eq(-elbow))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(Ok(()));
            device
                .expect_set_target()
                .with(eq(Actuator::Wrist), eq(-wrist))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(Ok(()));
        }
        let rig = Arc::new(JointRig::new(Arc::new(device)));
        let (dispatcher, worker) = ActuationDispatcher::new(rig, 8);
        let (faults, _fault_rx) = FaultReporter::channel();

        // Act
        let handle = worker.spawn(faults);
        dispatcher.dispatch(target(10.0, 5.0));
        dispatcher.dispatch(target(11.0, 6.0));
        drop(dispatcher);

        // Assert – worker drains then exits; mock verifies the sequence on drop
        tokio_test::assert_ok!(handle.await);
    }

    #[tokio::test]
    async fn test_worker_reports_device_fault_and_stops() {
        // Arrange
        let mut device = MockActuatorDevice::new();
        device.expect_set_target().return_const(Err(DeviceError::Fault {
            actuator: Actuator::ElbowA,
            reason: "overcurrent".into(),
        }));
        let rig = Arc::new(JointRig::new(Arc::new(device)));
        let (dispatcher, worker) = ActuationDispatcher::new(rig, 8);
        let (faults, mut fault_rx) = FaultReporter::channel();

        // Act
        let handle = worker.spawn(faults);
        dispatcher.dispatch(target(1.0, 1.0));

        // Assert
        let fault = fault_rx.recv().await.expect("fault must be reported");
        assert!(matches!(fault, NodeError::Device(DeviceError::Fault { .. })));
        handle.await.unwrap();
        assert_eq!(dispatcher.dispatch(target(2.0, 2.0)), DispatchOutcome::WorkerStopped);
    }
}
