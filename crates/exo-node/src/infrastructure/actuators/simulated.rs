//! Simulated rig.
//!
//! Motors reach a commanded target instantly.  Releasing a motor leaves its
//! encoder where it was.  After `shutdown` the device reports itself
//! unavailable.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::application::drive_joints::{Actuator, ActuatorDevice, DeviceError};

#[derive(Debug, Default)]
struct Rig {
    positions: [f64; 3],
    powered_off: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedActuatorDevice {
    rig: Mutex<Rig>,
}

impl SimulatedActuatorDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_position<R>(
        &self,
        actuator: Actuator,
        f: impl FnOnce(&mut f64) -> R,
    ) -> Result<R, DeviceError> {
        let mut rig = self.rig.lock().unwrap_or_else(PoisonError::into_inner);
        if rig.powered_off {
            return Err(DeviceError::Unavailable("simulated rig is shut down".into()));
        }
        Ok(f(&mut rig.positions[actuator.index()]))
    }
}

impl ActuatorDevice for SimulatedActuatorDevice {
    fn read_position(&self, actuator: Actuator) -> Result<f64, DeviceError> {
        self.with_position(actuator, |p| *p)
    }

    fn set_target(&self, actuator: Actuator, position: f64) -> Result<(), DeviceError> {
        self.with_position(actuator, |p| *p = position)
    }

    fn release(&self, actuator: Actuator) -> Result<(), DeviceError> {
        self.with_position(actuator, |_| ())
    }

    fn reset(&self, actuator: Actuator) -> Result<(), DeviceError> {
        self.with_position(actuator, |p| *p = 0.0)
    }

    fn shutdown(&self) -> Result<(), DeviceError> {
        self.rig
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .powered_off = true;
        debug!("simulated rig powered off");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::drive_joints::JointRig;
    use exo_core::JointPose;
    use std::sync::Arc;

    #[test]
    fn test_commanded_pose_reads_back() {
        // Arrange
        let rig = JointRig::new(Arc::new(SimulatedActuatorDevice::new()));

        // Act
        rig.command_pose(JointPose::new(30.0, -12.0)).unwrap();

        // Assert
        assert_eq!(rig.read_pose().unwrap(), JointPose::new(30.0, -12.0));
    }

    #[test]
    fn test_release_keeps_position() {
        let device = SimulatedActuatorDevice::new();
        device.set_target(Actuator::Wrist, 5.0).unwrap();

        device.release(Actuator::Wrist).unwrap();

        assert_eq!(device.read_position(Actuator::Wrist).unwrap(), 5.0);
    }

    #[test]
    fn test_shutdown_disables_device() {
        let device = SimulatedActuatorDevice::new();
        device.set_target(Actuator::ElbowA, 1.0).unwrap();

        device.shutdown().unwrap();

        assert!(matches!(
            device.read_position(Actuator::ElbowA),
            Err(DeviceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_reset_zeroes_position() {
        let device = SimulatedActuatorDevice::new();
        device.set_target(Actuator::ElbowC, -40.0).unwrap();

        device.reset(Actuator::ElbowC).unwrap();

        assert_eq!(device.read_position(Actuator::ElbowC).unwrap(), 0.0);
    }
}
