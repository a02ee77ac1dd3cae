//! Elbow travel limits.
//!
//! Both limits arrive from the peer independently (`border lower <v>`,
//! `border upper <v>`) and either may still be unset when the limiter starts.
//! An unset side imposes no limit.

/// Lower and upper elbow limits in actuator-native units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Boundary {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Outcome of checking one elbow reading against a [`Boundary`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundCheck {
    /// The reading is inside the limits (or no limit applies).
    Within,
    /// The reading is below the lower limit, carried here.
    BelowLower(f64),
    /// The reading is above the upper limit, carried here.
    AboveUpper(f64),
}

impl BoundCheck {
    /// The joint angle the elbow must be driven back to, if any.
    pub fn clamp_target(self) -> Option<f64> {
        match self {
            BoundCheck::Within => None,
            BoundCheck::BelowLower(v) | BoundCheck::AboveUpper(v) => Some(v),
        }
    }
}

impl Boundary {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// Checks an elbow reading.  The lower limit is tested first.
    ///
    /// A NaN reading compares false against both limits and is reported as
    /// [`BoundCheck::Within`].
    pub fn check(&self, elbow: f64) -> BoundCheck {
        if let Some(lower) = self.lower {
            if elbow < lower {
                return BoundCheck::BelowLower(lower);
            }
        }
        if let Some(upper) = self.upper {
            if elbow > upper {
                return BoundCheck::AboveUpper(upper);
            }
        }
        BoundCheck::Within
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_boundary_never_clamps() {
        let b = Boundary::default();
        assert_eq!(b.check(-1.0e9), BoundCheck::Within);
        assert_eq!(b.check(1.0e9), BoundCheck::Within);
    }

    #[test]
    fn test_below_lower_reports_lower() {
        // Arrange
        let b = Boundary::new(Some(10.0), Some(80.0));

        // Act
        let check = b.check(5.0);

        // Assert
        assert_eq!(check, BoundCheck::BelowLower(10.0));
        assert_eq!(check.clamp_target(), Some(10.0));
    }

    #[test]
    fn test_above_upper_reports_upper() {
        let b = Boundary::new(Some(10.0), Some(80.0));
        assert_eq!(b.check(81.0), BoundCheck::AboveUpper(80.0));
    }

    #[test]
    fn test_on_the_limit_is_within() {
        let b = Boundary::new(Some(10.0), Some(80.0));
        assert_eq!(b.check(10.0), BoundCheck::Within);
        assert_eq!(b.check(80.0), BoundCheck::Within);
    }

    #[test]
    fn test_single_sided_limits() {
        let only_upper = Boundary::new(None, Some(45.0));
        assert_eq!(only_upper.check(-300.0), BoundCheck::Within);
        assert_eq!(only_upper.check(46.0), BoundCheck::AboveUpper(45.0));

        let only_lower = Boundary::new(Some(-5.0), None);
        assert_eq!(only_lower.check(300.0), BoundCheck::Within);
        assert_eq!(only_lower.check(-6.0), BoundCheck::BelowLower(-5.0));
    }

    #[test]
    fn test_nan_reading_is_within() {
        let b = Boundary::new(Some(0.0), Some(1.0));
        assert_eq!(b.check(f64::NAN), BoundCheck::Within);
    }
}
