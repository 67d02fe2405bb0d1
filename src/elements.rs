//! Classical Keplerian element sets and their validation.
//!
//! Angles are stored in radians; the degree-based constructors and
//! [`KeplerianElements::to_degrees`] are the boundary representation
//! `[a, e, i, Ω, ω, M]` (km, -, deg, deg, deg, deg).
//!
//! For circular (`e ≈ 0`) or equatorial (`i ≈ 0°/180°`) orbits the argument
//! of periapsis and/or the node are not individually defined. Conversions
//! still produce finite, self-consistent values in those cases; only the
//! combinations that fix the position on the orbit are meaningful.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

/// Element-set and state-vector errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    #[error("Expected 6 values, got {0}")]
    WrongArity(usize),

    #[error("Semi-major axis must be positive, got {0} km")]
    InvalidSemiMajorAxis(f64),

    #[error("Eccentricity must lie in [0, 1), got {0}")]
    InvalidEccentricity(f64),

    #[error("Non-finite value in field '{0}'")]
    NonFinite(&'static str),

    #[error("Degenerate state: |r| = {r_mag} km, |v| = {v_mag} km/s")]
    DegenerateState { r_mag: f64, v_mag: f64 },

    #[error("State is not on a bound orbit: specific energy {energy} km²/s² is non-negative")]
    UnboundOrbit { energy: f64 },
}

/// Classical (osculating) Keplerian orbital elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    /// Semi-major axis (km)
    pub a: f64,
    /// Eccentricity (dimensionless)
    pub e: f64,
    /// Inclination (rad)
    pub i: f64,
    /// Right ascension of ascending node (rad)
    pub raan: f64,
    /// Argument of perigee (rad)
    pub aop: f64,
    /// Mean anomaly (rad)
    pub ma: f64,
}

impl KeplerianElements {
    /// Create new Keplerian elements from values in degrees (convenience constructor).
    pub fn from_degrees(a: f64, e: f64, i_deg: f64, raan_deg: f64, aop_deg: f64, ma_deg: f64) -> Self {
        Self {
            a,
            e,
            i: i_deg * DEG2RAD,
            raan: raan_deg * DEG2RAD,
            aop: aop_deg * DEG2RAD,
            ma: ma_deg * DEG2RAD,
        }
    }

    /// Parse and validate a boundary tuple `[a, e, i, Ω, ω, M]` (km, -, degrees).
    pub fn from_degrees_slice(values: &[f64]) -> Result<Self, ElementError> {
        let [a, e, i, raan, aop, ma]: [f64; 6] = values
            .try_into()
            .map_err(|_| ElementError::WrongArity(values.len()))?;
        let elements = Self::from_degrees(a, e, i, raan, aop, ma);
        elements.validate()?;
        Ok(elements)
    }

    /// Boundary tuple `[a, e, i, Ω, ω, M]` with angles in degrees.
    pub fn to_degrees(&self) -> [f64; 6] {
        [
            self.a,
            self.e,
            self.i * RAD2DEG,
            self.raan * RAD2DEG,
            self.aop * RAD2DEG,
            self.ma * RAD2DEG,
        ]
    }

    /// Check the supported regime: finite values, `a > 0`, `0 ≤ e < 1`.
    pub fn validate(&self) -> Result<(), ElementError> {
        let fields = [
            ("a", self.a),
            ("e", self.e),
            ("i", self.i),
            ("raan", self.raan),
            ("aop", self.aop),
            ("ma", self.ma),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ElementError::NonFinite(*name));
        }
        if self.a <= 0.0 {
            return Err(ElementError::InvalidSemiMajorAxis(self.a));
        }
        if !(0.0..1.0).contains(&self.e) {
            return Err(ElementError::InvalidEccentricity(self.e));
        }
        Ok(())
    }

    /// Same orbit with a different mean anomaly (rad).
    pub fn with_mean_anomaly(self, ma: f64) -> Self {
        Self { ma, ..self }
    }

    /// Mean motion (rad/s).
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.a.powi(3)).sqrt()
    }

    /// Orbital period (seconds).
    pub fn period(&self) -> f64 {
        TAU / self.mean_motion()
    }

    /// Specific orbital energy −μ/(2a) (km²/s²).
    pub fn energy(&self) -> f64 {
        -MU_EARTH / (2.0 * self.a)
    }

    /// Periapsis radius (km).
    pub fn periapsis(&self) -> f64 {
        self.a * (1.0 - self.e)
    }

    /// Apoapsis radius (km).
    pub fn apoapsis(&self) -> f64 {
        self.a * (1.0 + self.e)
    }
}

impl fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "a={:.3} km, e={:.6}, i={:.4}°, RAAN={:.4}°, AoP={:.4}°, MA={:.4}°",
            self.a,
            self.e,
            self.i * RAD2DEG,
            self.raan * RAD2DEG,
            self.aop * RAD2DEG,
            self.ma * RAD2DEG,
        )
    }
}

/// Normalize angle to [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    let a = if a < 0.0 { a + TAU } else { a };
    // a tiny negative remainder can round up to exactly TAU; `+ 0.0` turns -0.0 into 0.0
    if a >= TAU { 0.0 } else { a + 0.0 }
}

/// Normalize angle to [-π, π).
pub fn normalize_angle_pm(angle: f64) -> f64 {
    let a = normalize_angle(angle);
    if a >= std::f64::consts::PI { a - TAU } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_degrees_slice() {
        let elems = KeplerianElements::from_degrees_slice(&[7000.0, 0.1, 45.0, 90.0, 30.0, 0.0]).unwrap();
        assert_relative_eq!(elems.i, std::f64::consts::FRAC_PI_4, epsilon = 1e-15);
        assert_relative_eq!(elems.raan, std::f64::consts::FRAC_PI_2, epsilon = 1e-15);

        let back = elems.to_degrees();
        assert_relative_eq!(back[2], 45.0, epsilon = 1e-12);
        assert_relative_eq!(back[4], 30.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_arity() {
        assert_eq!(
            KeplerianElements::from_degrees_slice(&[7000.0, 0.1, 45.0]),
            Err(ElementError::WrongArity(3))
        );
        assert_eq!(
            KeplerianElements::from_degrees_slice(&[0.0; 7]),
            Err(ElementError::WrongArity(7))
        );
    }

    #[test]
    fn test_validation() {
        let bad_a = KeplerianElements::from_degrees(-7000.0, 0.1, 45.0, 0.0, 0.0, 0.0);
        assert_eq!(bad_a.validate(), Err(ElementError::InvalidSemiMajorAxis(-7000.0)));

        let zero_a = KeplerianElements::from_degrees(0.0, 0.1, 45.0, 0.0, 0.0, 0.0);
        assert!(matches!(zero_a.validate(), Err(ElementError::InvalidSemiMajorAxis(_))));

        let parabolic = KeplerianElements::from_degrees(7000.0, 1.0, 45.0, 0.0, 0.0, 0.0);
        assert_eq!(parabolic.validate(), Err(ElementError::InvalidEccentricity(1.0)));

        let negative_e = KeplerianElements::from_degrees(7000.0, -0.01, 45.0, 0.0, 0.0, 0.0);
        assert!(matches!(negative_e.validate(), Err(ElementError::InvalidEccentricity(_))));

        let nan_i = KeplerianElements::from_degrees(7000.0, 0.0, f64::NAN, 0.0, 0.0, 0.0);
        assert_eq!(nan_i.validate(), Err(ElementError::NonFinite("i")));

        let circular = KeplerianElements::from_degrees(7000.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(circular.validate().is_ok());
    }

    #[test]
    fn test_period_leo() {
        let elems = KeplerianElements::from_degrees(R_EARTH + 420.0, 0.0, 51.6, 0.0, 0.0, 0.0);
        // ~93 minutes
        assert_relative_eq!(elems.period() / 60.0, 93.0, epsilon = 0.1);
        assert_relative_eq!(elems.energy(), -MU_EARTH / (2.0 * elems.a), epsilon = 1e-12);
        assert_relative_eq!(elems.periapsis(), elems.apoapsis(), epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(-0.5), TAU - 0.5, epsilon = 1e-15);
        assert_relative_eq!(normalize_angle(TAU + 0.25), 0.25, epsilon = 1e-15);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert!(normalize_angle(-1e-300) < TAU);
        assert!(normalize_angle(-0.0).is_sign_positive());
        assert!(normalize_angle(-TAU).is_sign_positive());
        assert_relative_eq!(normalize_angle_pm(1.5 * std::f64::consts::PI), -0.5 * std::f64::consts::PI, epsilon = 1e-15);
    }
}
