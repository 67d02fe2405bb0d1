//! Kepler's equation and the Keplerian ↔ Cartesian state conversion.
//!
//! Both directions work in dimensionless units: lengths in [`LENGTH_UNIT`],
//! times in [`TIME_UNIT`], so that μ = 1 inside the routines. Inputs and
//! outputs are km and km/s.
//!
//! The orbit orientation is carried by the perifocal unit vectors P (toward
//! periapsis) and Q (90° ahead of it in the orbit plane). Only their
//! trigonometric combinations enter the position, so the forward direction
//! stays well defined when ω or Ω is not.
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::elements::{normalize_angle, ElementError, KeplerianElements};

// ── Kepler's equation ──

/// Outcome of a Newton–Raphson solve of `E − e sin E = M`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolution {
    /// Eccentric anomaly (rad). The last iterate if `converged` is false.
    pub eccentric_anomaly: f64,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the last update fell below [`KEPLER_TOLERANCE`].
    pub converged: bool,
}

/// Solve Kepler's equation M = E - e sin(E) for eccentric anomaly.
///
/// `m` is reduced to [0, 2π) and used as the starting guess. The iteration
/// stops once an update is smaller than [`KEPLER_TOLERANCE`] or after
/// [`KEPLER_MAX_ITER`] steps; in the latter case the last estimate is
/// returned with `converged = false`. For `e` up to about 0.95 the cap is
/// never reached; very eccentric orbits (`e ≳ 0.99`) can hit it.
pub fn solve_kepler(m: f64, e: f64) -> KeplerSolution {
    let m = normalize_angle(m);
    let mut ea = m;

    for iter in 1..=KEPLER_MAX_ITER {
        let delta = (ea - e * ea.sin() - m) / (1.0 - e * ea.cos());
        ea -= delta;
        if delta.abs() < KEPLER_TOLERANCE {
            tracing::trace!(iterations = iter, "kepler solve converged");
            return KeplerSolution {
                eccentric_anomaly: ea,
                iterations: iter,
                converged: true,
            };
        }
    }

    KeplerSolution {
        eccentric_anomaly: ea,
        iterations: KEPLER_MAX_ITER,
        converged: false,
    }
}

/// Convert eccentric anomaly to true anomaly.
pub fn eccentric_to_true_anomaly(ea: f64, e: f64) -> f64 {
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin())
        .atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}

// ── State vector ──

/// Cartesian state in an inertial frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianState {
    /// Position (km): [x, y, z]
    pub r: [f64; 3],
    /// Velocity (km/s): [vx, vy, vz]
    pub v: [f64; 3],
}

/// A forward conversion together with the Kepler solve behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub state: CartesianState,
    pub kepler: KeplerSolution,
}

impl Conversion {
    /// False when the Kepler solve hit the iteration cap (the state is a best estimate).
    pub fn converged(&self) -> bool {
        self.kepler.converged
    }
}

impl CartesianState {
    pub fn new(r: [f64; 3], v: [f64; 3]) -> Self {
        Self { r, v }
    }

    /// Parse a boundary tuple `[x, y, z, vx, vy, vz]` (km, km/s).
    pub fn from_slice(values: &[f64]) -> Result<Self, ElementError> {
        let [x, y, z, vx, vy, vz]: [f64; 6] = values
            .try_into()
            .map_err(|_| ElementError::WrongArity(values.len()))?;
        let state = Self::new([x, y, z], [vx, vy, vz]);
        if !state.r.iter().all(|c| c.is_finite()) {
            return Err(ElementError::NonFinite("r"));
        }
        if !state.v.iter().all(|c| c.is_finite()) {
            return Err(ElementError::NonFinite("v"));
        }
        Ok(state)
    }

    /// Boundary tuple `[x, y, z, vx, vy, vz]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.r[0], self.r[1], self.r[2], self.v[0], self.v[1], self.v[2]]
    }

    /// Position magnitude (km).
    pub fn r_mag(&self) -> f64 {
        norm(&self.r)
    }

    /// Velocity magnitude (km/s).
    pub fn v_mag(&self) -> f64 {
        norm(&self.v)
    }

    /// Specific orbital energy (km²/s²).
    pub fn energy(&self) -> f64 {
        self.v_mag().powi(2) / 2.0 - MU_EARTH / self.r_mag()
    }

    /// Semi-major axis from vis-viva (km).
    pub fn sma(&self) -> f64 {
        -MU_EARTH / (2.0 * self.energy())
    }

    /// Specific angular momentum r × v (km²/s).
    pub fn angular_momentum(&self) -> [f64; 3] {
        cross(&self.r, &self.v)
    }

    /// Convert from Keplerian elements.
    pub fn from_keplerian(elements: &KeplerianElements) -> Result<Self, ElementError> {
        Ok(Self::from_keplerian_checked(elements)?.state)
    }

    /// Convert from Keplerian elements, reporting the Kepler solve.
    ///
    /// A solve that hits the iteration cap is not an error; the best estimate
    /// is used, `converged()` is false and a warning is logged.
    pub fn from_keplerian_checked(elements: &KeplerianElements) -> Result<Conversion, ElementError> {
        elements.validate()?;

        let a = elements.a / LENGTH_UNIT;
        let e = elements.e;
        let (p, q) = perifocal_basis(elements.i, elements.raan, elements.aop);

        let kepler = solve_kepler(elements.ma, e);
        if !kepler.converged {
            tracing::warn!(
                ma = elements.ma,
                e,
                ea = kepler.eccentric_anomaly,
                "Kepler's equation did not converge in {} iterations; using last estimate",
                KEPLER_MAX_ITER
            );
        }

        let (sin_e, cos_e) = kepler.eccentric_anomaly.sin_cos();
        let eta = (1.0 - e * e).sqrt();

        let r: [f64; 3] = std::array::from_fn(|k| a * (cos_e - e) * p[k] + a * eta * sin_e * q[k]);
        let v_factor = a.sqrt() / norm(&r);
        let v: [f64; 3] = std::array::from_fn(|k| v_factor * (-sin_e * p[k] + eta * cos_e * q[k]));

        Ok(Conversion {
            state: CartesianState {
                r: r.map(|x| x * LENGTH_UNIT),
                v: v.map(|x| x * VELOCITY_UNIT),
            },
            kepler,
        })
    }

    /// Convert to Keplerian elements.
    ///
    /// Fails on a zero position or velocity, on purely radial motion, and on
    /// unbound (parabolic or hyperbolic) states. For circular or equatorial
    /// states ω and Ω are returned as whatever the closed-form expressions
    /// give; they are finite and convert back to the same state, but are
    /// not individually meaningful.
    pub fn to_keplerian(&self) -> Result<KeplerianElements, ElementError> {
        let r_mag_km = self.r_mag();
        let v_mag_kms = self.v_mag();
        if !r_mag_km.is_finite() || !v_mag_kms.is_finite() {
            return Err(ElementError::NonFinite(if r_mag_km.is_finite() { "v" } else { "r" }));
        }
        if r_mag_km == 0.0 || v_mag_kms == 0.0 {
            return Err(ElementError::DegenerateState {
                r_mag: r_mag_km,
                v_mag: v_mag_kms,
            });
        }

        // μ = 1 in these units
        let r = self.r.map(|x| x / LENGTH_UNIT);
        let v = self.v.map(|x| x / VELOCITY_UNIT);
        let r_mag = norm(&r);
        let v_mag = norm(&v);

        let h_raw = cross(&r, &v);
        if norm(&h_raw) <= f64::EPSILON * r_mag * v_mag {
            // rectilinear: r ∥ v, no orbit plane
            return Err(ElementError::DegenerateState {
                r_mag: r_mag_km,
                v_mag: v_mag_kms,
            });
        }

        let inv_a = 2.0 / r_mag - v_mag * v_mag;
        if inv_a <= 0.0 {
            return Err(ElementError::UnboundOrbit { energy: self.energy() });
        }
        let a = 1.0 / inv_a;
        let sqrt_a = a.sqrt();

        let rv = dot(&r, &v);
        let e_sin = rv / sqrt_a;
        let e_cos = 1.0 - r_mag / a;
        let e = e_sin.hypot(e_cos);
        if e >= 1.0 {
            return Err(ElementError::DegenerateState {
                r_mag: r_mag_km,
                v_mag: v_mag_kms,
            });
        }

        let ea = e_sin.atan2(e_cos);
        let ma = normalize_angle(ea - e * ea.sin());

        let (sin_e, cos_e) = ea.sin_cos();
        let inv_eta = 1.0 / (1.0 - e * e).sqrt();
        let p: [f64; 3] = std::array::from_fn(|k| cos_e / r_mag * r[k] - sqrt_a * sin_e * v[k]);
        let q: [f64; 3] =
            std::array::from_fn(|k| inv_eta * (sin_e / r_mag * r[k] + sqrt_a * (cos_e - e) * v[k]));

        let h_scale = 1.0 / (a * (1.0 - e * e)).sqrt();
        let h = h_raw.map(|x| x * h_scale);

        // same angle as acos(h_z), without its loss of precision near 0° and 180°
        let i = h[0].hypot(h[1]).atan2(h[2]);
        let raan = h[0].atan2(-h[1]);
        // ω measured from the node line; equals atan2(P_z, Q_z) whenever sin i ≠ 0
        // and stays consistent with Ω when the node is undefined
        let (sin_raan, cos_raan) = raan.sin_cos();
        let aop = (-(q[0] * cos_raan + q[1] * sin_raan)).atan2(p[0] * cos_raan + p[1] * sin_raan);

        Ok(KeplerianElements {
            a: a * LENGTH_UNIT,
            e,
            i: normalize_angle(i),
            raan: normalize_angle(raan),
            aop: normalize_angle(aop),
            ma,
        })
    }
}

/// Perifocal unit vectors P and Q for inclination, node and argument of periapsis (rad).
pub fn perifocal_basis(i: f64, raan: f64, aop: f64) -> ([f64; 3], [f64; 3]) {
    let (sin_raan, cos_raan) = raan.sin_cos();
    let (sin_aop, cos_aop) = aop.sin_cos();
    let (sin_i, cos_i) = i.sin_cos();

    let p = [
        cos_raan * cos_aop - sin_raan * sin_aop * cos_i,
        sin_raan * cos_aop + cos_raan * sin_aop * cos_i,
        sin_aop * sin_i,
    ];
    let q = [
        -cos_raan * sin_aop - sin_raan * cos_aop * cos_i,
        -sin_raan * sin_aop + cos_raan * cos_aop * cos_i,
        cos_aop * sin_i,
    ];
    (p, q)
}

/// `[a, e, i, Ω, ω, M]` (km, degrees) → `[x, y, z, vx, vy, vz]` (km, km/s).
pub fn keplerian_to_cartesian(elements: &[f64]) -> Result<[f64; 6], ElementError> {
    let elements = KeplerianElements::from_degrees_slice(elements)?;
    Ok(CartesianState::from_keplerian(&elements)?.to_array())
}

/// `[x, y, z, vx, vy, vz]` (km, km/s) → `[a, e, i, Ω, ω, M]` (km, degrees).
pub fn cartesian_to_keplerian(state: &[f64]) -> Result<[f64; 6], ElementError> {
    let state = CartesianState::from_slice(state)?;
    Ok(state.to_keplerian()?.to_degrees())
}

// ── Vector helpers ──

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
