//! Joint pose and the joint ↔ actuator mapping.
//!
//! Each rig has three actuators.  Two of them (A and C) are ganged on the
//! elbow; the third (B) drives the wrist.  Actuator encoders count in the
//! opposite direction to the joint convention used on the wire, so every
//! conversion flips the sign:
//!
//! ```text
//! elbow = -(A + C) / 2        A, C <- -elbow
//! wrist = -B                  B    <- -wrist
//! ```

/// Elbow and wrist angles in actuator-native units (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointPose {
    pub elbow: f64,
    pub wrist: f64,
}

impl JointPose {
    pub fn new(elbow: f64, wrist: f64) -> Self {
        Self { elbow, wrist }
    }

    /// Derives the pose from raw encoder readings of actuators A, B and C.
    pub fn from_encoders(a: f64, b: f64, c: f64) -> Self {
        Self {
            elbow: elbow_from_encoders(a, c),
            wrist: -b,
        }
    }
}

/// Elbow angle from the two ganged elbow encoders.
pub fn elbow_from_encoders(a: f64, c: f64) -> f64 {
    -(a + c) / 2.0
}

/// Actuator target that places a joint at `angle`.
pub fn actuator_target(angle: f64) -> f64 {
    -angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elbow_is_negated_average_of_ganged_encoders() {
        // Arrange / Act
        let pose = JointPose::from_encoders(-10.0, 0.0, -20.0);

        // Assert
        assert_eq!(pose.elbow, 15.0);
    }

    #[test]
    fn test_wrist_is_negated_encoder() {
        let pose = JointPose::from_encoders(0.0, 42.0, 0.0);
        assert_eq!(pose.wrist, -42.0);
    }

    #[test]
    fn test_actuator_target_inverts_sign() {
        assert_eq!(actuator_target(30.0), -30.0);
        assert_eq!(actuator_target(-7.5), 7.5);
    }

    #[test]
    fn test_target_then_read_is_identity_for_elbow() {
        // Both elbow actuators commanded to the same target read back as that joint angle.
        let target = actuator_target(12.0);
        assert_eq!(elbow_from_encoders(target, target), 12.0);
    }
}
