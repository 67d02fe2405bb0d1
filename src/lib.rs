//! # kepler-kernel
//!
//! Time and two-body orbit kernel for Earth orbits.
//! Provides calendar ↔ Modified Julian Date conversion, Keplerian ↔ Cartesian
//! state conversion with a Newton Kepler solver, analytic two-body
//! propagation over a uniform time grid, and a plain-text ephemeris format.
//!
//! Boundary units are km, km/s, seconds and degrees; element sets use the
//! order `[a, e, i, Ω, ω, M]`.

pub mod constants;
pub mod epoch;
pub mod elements;
pub mod kepler;
pub mod propagator;
pub mod ephemeris;

#[cfg(feature = "python")]
mod pybridge;

pub use elements::{ElementError, KeplerianElements};
pub use ephemeris::{Ephemeris, EphemerisError, EphemerisPoint};
pub use epoch::{date_to_mjd, mjd_to_date, CalendarDate, Epoch, TimeError};
pub use kepler::{cartesian_to_keplerian, keplerian_to_cartesian, CartesianState};
pub use propagator::{propagate, Propagation, PropagationError, PropagatorConfig, TwoBodyPropagator};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn kepler_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
