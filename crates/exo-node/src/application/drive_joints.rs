//! Joint-level access to the actuator hardware.
//!
//! The motor driver itself is an external collaborator reached through the
//! [`ActuatorDevice`] trait; implementations live in the infrastructure layer.
//! [`JointRig`] sits on top of it and owns the joint ↔ actuator mapping, so
//! nothing else in the node ever addresses a single elbow actuator alone.

use std::fmt;
use std::sync::Arc;

use exo_core::domain::pose::{actuator_target, elbow_from_encoders};
use exo_core::JointPose;
use thiserror::Error;
use tokio::task;

/// Error type for actuator device operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    /// A read or write on one actuator failed.
    #[error("actuator {actuator} fault: {reason}")]
    Fault { actuator: Actuator, reason: String },
    /// The device as a whole is unreachable.
    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// The three physical actuators of a rig, named by their driver port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    /// Port A, first elbow actuator.
    ElbowA,
    /// Port B, wrist actuator.
    Wrist,
    /// Port C, second elbow actuator, ganged with A.
    ElbowC,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::ElbowA, Actuator::Wrist, Actuator::ElbowC];
    pub const ELBOW: [Actuator; 2] = [Actuator::ElbowA, Actuator::ElbowC];

    /// Driver port letter.
    pub fn port(self) -> char {
        match self {
            Actuator::ElbowA => 'A',
            Actuator::Wrist => 'B',
            Actuator::ElbowC => 'C',
        }
    }

    /// Stable index (0..3) for array-backed device implementations.
    pub fn index(self) -> usize {
        match self {
            Actuator::ElbowA => 0,
            Actuator::Wrist => 1,
            Actuator::ElbowC => 2,
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port {}", self.port())
    }
}

/// Motor/encoder driver interface.
///
/// Calls may block on bus I/O for as long as the driver's own timeout allows.
#[cfg_attr(test, mockall::automock)]
pub trait ActuatorDevice: Send + Sync {
    /// Reads the encoder position of one actuator.
    fn read_position(&self, actuator: Actuator) -> Result<f64, DeviceError>;

    /// Drives one actuator to an encoder position and holds it there.
    fn set_target(&self, actuator: Actuator, position: f64) -> Result<(), DeviceError>;

    /// Removes power from one actuator so it moves freely.
    fn release(&self, actuator: Actuator) -> Result<(), DeviceError>;

    /// Zeroes the encoder of one actuator at its current position.
    fn reset(&self, actuator: Actuator) -> Result<(), DeviceError>;

    /// Unconfigures the device and powers every motor off.
    fn shutdown(&self) -> Result<(), DeviceError>;
}

/// Elbow/wrist view of an [`ActuatorDevice`].
pub struct JointRig {
    device: Arc<dyn ActuatorDevice>,
}

impl JointRig {
    pub fn new(device: Arc<dyn ActuatorDevice>) -> Self {
        Self { device }
    }

    /// Runs `op` on Tokio's blocking pool.
    ///
    /// Async code reaches the device only through here, so a slow bus never
    /// stalls the receive loop.
    pub async fn run_blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, DeviceError>
    where
        T: Send + 'static,
        F: FnOnce(&JointRig) -> Result<T, DeviceError> + Send + 'static,
    {
        let rig = Arc::clone(self);
        task::spawn_blocking(move || op(&rig))
            .await
            .unwrap_or_else(|e| Err(DeviceError::Unavailable(format!("device call aborted: {e}"))))
    }

    /// Reads the current elbow and wrist angles.
    pub fn read_pose(&self) -> Result<JointPose, DeviceError> {
        let [a, b, c] = self.read_encoders()?;
        Ok(JointPose::from_encoders(a, b, c))
    }

    /// Reads the elbow angle from both ganged actuators.
    pub fn read_elbow(&self) -> Result<f64, DeviceError> {
        let a = self.device.read_position(Actuator::ElbowA)?;
        let c = self.device.read_position(Actuator::ElbowC)?;
        Ok(elbow_from_encoders(a, c))
    }

    /// Drives both joints to `pose`.
    pub fn command_pose(&self, pose: JointPose) -> Result<(), DeviceError> {
        self.command_elbow(pose.elbow)?;
        self.device
            .set_target(Actuator::Wrist, actuator_target(pose.wrist))
    }

    /// Drives the elbow (both ganged actuators) to `angle`.
    pub fn command_elbow(&self, angle: f64) -> Result<(), DeviceError> {
        let target = actuator_target(angle);
        for actuator in Actuator::ELBOW {
            self.device.set_target(actuator, target)?;
        }
        Ok(())
    }

    pub fn release_elbow(&self) -> Result<(), DeviceError> {
        for actuator in Actuator::ELBOW {
            self.device.release(actuator)?;
        }
        Ok(())
    }

    pub fn release_all(&self) -> Result<(), DeviceError> {
        for actuator in Actuator::ALL {
            self.device.release(actuator)?;
        }
        Ok(())
    }

    /// Zeroes every encoder at the current physical position.
    pub fn reset_encoders(&self) -> Result<(), DeviceError> {
        for actuator in Actuator::ALL {
            self.device.reset(actuator)?;
        }
        Ok(())
    }

    /// Raw encoder readings, A/B/C order.
    pub fn read_encoders(&self) -> Result<[f64; 3], DeviceError> {
        Ok([
            self.device.read_position(Actuator::ElbowA)?,
            self.device.read_position(Actuator::Wrist)?,
            self.device.read_position(Actuator::ElbowC)?,
        ])
    }

    /// Releases every actuator, then powers the device off.
    ///
    /// The device shutdown is attempted even when releasing fails; the first
    /// error is returned.
    pub fn shutdown(&self) -> Result<(), DeviceError> {
        let released = self.release_all();
        let shut_down = self.device.shutdown();
        released.and(shut_down)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
