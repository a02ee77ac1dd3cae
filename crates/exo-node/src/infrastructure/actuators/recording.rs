//! Recording actuator device for tests.
//!
//! `RecordingActuatorDevice` performs no I/O.  Reads return whatever was set
//! with [`RecordingActuatorDevice::set_pose`]; every write is pushed into a
//! `Mutex<Vec<...>>` so assertions can inspect exactly what was commanded and
//! in what order.
//!
//! # `should_fail` flag
//!
//! Flip `should_fail` at any time (it is atomic, so this works through an
//! `Arc` while a node is running) to make every call return a
//! [`DeviceError::Fault`].
//!
//! [`RecordingActuatorDevice::set_read_delay`] makes every read sleep, which
//! stands in for a slow bus.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use exo_core::domain::pose::actuator_target;
use exo_core::JointPose;

use crate::application::drive_joints::{Actuator, ActuatorDevice, DeviceError};

#[derive(Default)]
pub struct RecordingActuatorDevice {
    /// Encoder readings in A/B/C order.
    pub positions: Mutex<[f64; 3]>,
    /// Every `set_target` call.
    pub targets: Mutex<Vec<(Actuator, f64)>>,
    /// Every `release` call.
    pub releases: Mutex<Vec<Actuator>>,
    /// Every `reset` call.
    pub resets: Mutex<Vec<Actuator>>,
    /// Number of `shutdown` calls.
    pub shutdowns: AtomicUsize,
    pub should_fail: AtomicBool,
    read_delay_us: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingActuatorDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the encoders so that the rig reads back `pose`.
    pub fn set_pose(&self, pose: JointPose) {
        let elbow = actuator_target(pose.elbow);
        *lock(&self.positions) = [elbow, actuator_target(pose.wrist), elbow];
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Blocks the calling thread for `delay` on every `read_position`.
    pub fn set_read_delay(&self, delay: Duration) {
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        self.read_delay_us.store(micros, Ordering::SeqCst);
    }

    /// Snapshot of the recorded targets.
    pub fn targets(&self) -> Vec<(Actuator, f64)> {
        lock(&self.targets).clone()
    }

    /// Snapshot of the recorded releases.
    pub fn releases(&self) -> Vec<Actuator> {
        lock(&self.releases).clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    fn check(&self, actuator: Actuator) -> Result<(), DeviceError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DeviceError::Fault {
                actuator,
                reason: "mock failure".into(),
            });
        }
        Ok(())
    }
}

impl ActuatorDevice for RecordingActuatorDevice {
    fn read_position(&self, actuator: Actuator) -> Result<f64, DeviceError> {
        let delay = self.read_delay_us.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_micros(delay));
        }
        self.check(actuator)?;
        Ok(lock(&self.positions)[actuator.index()])
    }

    fn set_target(&self, actuator: Actuator, position: f64) -> Result<(), DeviceError> {
        self.check(actuator)?;
        lock(&self.targets).push((actuator, position));
        Ok(())
    }

    fn release(&self, actuator: Actuator) -> Result<(), DeviceError> {
        self.check(actuator)?;
        lock(&self.releases).push(actuator);
        Ok(())
    }

    fn reset(&self, actuator: Actuator) -> Result<(), DeviceError> {
        self.check(actuator)?;
        lock(&self.resets).push(actuator);
        lock(&self.positions)[actuator.index()] = 0.0;
        Ok(())
    }

    /// Counted even when `should_fail` is set, so cleanup can be observed
    /// after an injected fault.
    fn shutdown(&self) -> Result<(), DeviceError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
