//! Physical, unit-scaling and numerical constants.
//!
//! These are fixed for the lifetime of the process and shared read-only by
//! every conversion and propagation routine.

/// Earth gravitational parameter (km³/s²)
pub const MU_EARTH: f64 = 398600.4418;

/// Earth equatorial radius (km) — GGM03C/EGM96
pub const R_EARTH: f64 = 6378.1363;

/// Internal length unit (km). One Earth radius.
pub const LENGTH_UNIT: f64 = R_EARTH;

/// Internal time unit (s): √(LENGTH_UNIT³ / MU_EARTH), so that μ = 1 internally.
pub const TIME_UNIT: f64 = 806.8109910031163;

/// Internal velocity unit (km/s).
pub const VELOCITY_UNIT: f64 = LENGTH_UNIT / TIME_UNIT;

/// Seconds per solar day
pub const SOLAR_DAY: f64 = 86400.0;

/// Offset between Julian Date and Modified Julian Date (days)
pub const MJD_JD_OFFSET: f64 = 2_400_000.5;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Newton–Raphson iteration cap for Kepler's equation.
pub const KEPLER_MAX_ITER: usize = 10;

/// Absolute convergence tolerance on successive eccentric-anomaly updates (rad).
pub const KEPLER_TOLERANCE: f64 = 1e-12;

/// Default upper bound on the number of samples in one propagation grid.
pub const MAX_EPHEMERIS_SAMPLES: usize = 10_000_000;
