//! Python bindings via PyO3.
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::constants;
use crate::elements::KeplerianElements;
use crate::ephemeris::Ephemeris;
use crate::epoch::{self, Epoch};
use crate::kepler::{self, CartesianState};
use crate::propagator::{Propagation, PropagatorConfig, TwoBodyPropagator};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn ephemeris_rows(ephemeris: &Ephemeris) -> Vec<Vec<f64>> {
    ephemeris
        .iter()
        .map(|p| {
            let [x, y, z, vx, vy, vz] = p.state.to_array();
            vec![p.epoch.mjd(), x, y, z, vx, vy, vz]
        })
        .collect()
}

// KeplerianElements
#[pyclass(name = "KeplerianElements")]
#[derive(Clone)]
pub struct PyKeplerianElements {
    pub(crate) inner: KeplerianElements,
}

#[pymethods]
impl PyKeplerianElements {
    #[new]
    fn new(a: f64, e: f64, i_deg: f64, raan_deg: f64, aop_deg: f64, ma_deg: f64) -> PyResult<Self> {
        KeplerianElements::from_degrees_slice(&[a, e, i_deg, raan_deg, aop_deg, ma_deg])
            .map(|inner| PyKeplerianElements { inner })
            .map_err(value_error)
    }

    /// Build from a state vector [x,y,z,vx,vy,vz] in km and km/s.
    #[staticmethod]
    fn from_state_vector(state: Vec<f64>) -> PyResult<Self> {
        CartesianState::from_slice(&state)
            .and_then(|s| s.to_keplerian())
            .map(|inner| PyKeplerianElements { inner })
            .map_err(value_error)
    }

    /// Convert to Cartesian state vector [x,y,z,vx,vy,vz] in km and km/s.
    fn to_state_vector(&self) -> PyResult<Vec<f64>> {
        CartesianState::from_keplerian(&self.inner)
            .map(|s| s.to_array().to_vec())
            .map_err(value_error)
    }

    /// Boundary tuple [a, e, i, raan, aop, ma] with angles in degrees.
    fn to_list(&self) -> Vec<f64> {
        self.inner.to_degrees().to_vec()
    }

    fn period(&self) -> f64 { self.inner.period() }
    fn mean_motion(&self) -> f64 { self.inner.mean_motion() }

    #[getter] fn a(&self) -> f64 { self.inner.a }
    #[getter] fn e(&self) -> f64 { self.inner.e }
    #[getter] fn i_deg(&self) -> f64 { self.inner.i * constants::RAD2DEG }
    #[getter] fn raan_deg(&self) -> f64 { self.inner.raan * constants::RAD2DEG }
    #[getter] fn aop_deg(&self) -> f64 { self.inner.aop * constants::RAD2DEG }
    #[getter] fn ma_deg(&self) -> f64 { self.inner.ma * constants::RAD2DEG }

    fn __repr__(&self) -> String {
        format!("KeplerianElements({})", self.inner)
    }
}

// Propagator
#[pyclass(name = "Propagator")]
pub struct PyPropagator {
    inner: TwoBodyPropagator,
    last: Option<Propagation>,
}

#[pymethods]
impl PyPropagator {
    /// Create a two-body propagator.
    ///
    /// Args:
    ///     max_samples: Largest accepted time grid (default: 10_000_000)
    #[new]
    #[pyo3(signature = (max_samples=constants::MAX_EPHEMERIS_SAMPLES))]
    fn new(max_samples: usize) -> Self {
        PyPropagator {
            inner: TwoBodyPropagator::new(PropagatorConfig::default().with_max_samples(max_samples)),
            last: None,
        }
    }

    /// Propagate from an MJD epoch.
    ///
    /// Returns list of [mjd, x, y, z, vx, vy, vz] arrays.
    fn propagate(
        &mut self,
        elements: &PyKeplerianElements,
        epoch_mjd: f64,
        step_s: f64,
        duration_s: f64,
    ) -> PyResult<Vec<Vec<f64>>> {
        let out = self
            .inner
            .propagate(Epoch::from_mjd(epoch_mjd), &elements.inner, step_s, duration_s)
            .map_err(value_error)?;
        let rows = ephemeris_rows(&out.ephemeris);
        self.last = Some(out);
        Ok(rows)
    }

    /// Propagate elements given at `element_mjd` over the window [start_mjd, end_mjd].
    ///
    /// Returns list of [mjd, x, y, z, vx, vy, vz] arrays.
    fn propagate_window(
        &mut self,
        elements: &PyKeplerianElements,
        element_mjd: f64,
        start_mjd: f64,
        end_mjd: f64,
        step_s: f64,
    ) -> PyResult<Vec<Vec<f64>>> {
        let out = self
            .inner
            .propagate_window(
                Epoch::from_mjd(element_mjd),
                &elements.inner,
                Epoch::from_mjd(start_mjd),
                Epoch::from_mjd(end_mjd),
                step_s,
            )
            .map_err(value_error)?;
        let rows = ephemeris_rows(&out.ephemeris);
        self.last = Some(out);
        Ok(rows)
    }

    /// State [x,y,z,vx,vy,vz] of the sample nearest to `mjd` in the most recent propagation.
    fn state_at(&self, mjd: f64) -> Option<Vec<f64>> {
        self.last
            .as_ref()
            .and_then(|p| p.ephemeris.nearest(Epoch::from_mjd(mjd)))
            .map(|point| point.state.to_array().to_vec())
    }

    /// Elements at the last sample of the most recent propagation.
    fn final_elements(&self) -> Option<PyKeplerianElements> {
        self.last
            .as_ref()
            .map(|p| PyKeplerianElements { inner: p.final_elements })
    }

    /// Sample indices of the most recent propagation whose Kepler solve did not converge.
    fn non_converged(&self) -> Vec<usize> {
        self.last
            .as_ref()
            .map(|p| p.non_converged.clone())
            .unwrap_or_default()
    }

    /// Ephemeris table text of the most recent propagation.
    fn to_text(&self) -> String {
        self.last
            .as_ref()
            .map(|p| p.ephemeris.to_text())
            .unwrap_or_else(|| Ephemeris::new().to_text())
    }
}

// Free functions
#[pyfunction]
fn date_to_mjd(date: &str) -> PyResult<f64> {
    epoch::date_to_mjd(date).map(|t| t.mjd()).map_err(value_error)
}

#[pyfunction]
fn mjd_to_date(mjd: f64) -> PyResult<String> {
    epoch::mjd_to_date(Epoch::from_mjd(mjd)).map_err(value_error)
}

#[pyfunction]
fn keplerian_to_cartesian(elements: Vec<f64>) -> PyResult<Vec<f64>> {
    kepler::keplerian_to_cartesian(&elements)
        .map(|s| s.to_vec())
        .map_err(value_error)
}

#[pyfunction]
fn cartesian_to_keplerian(state: Vec<f64>) -> PyResult<Vec<f64>> {
    kepler::cartesian_to_keplerian(&state)
        .map(|e| e.to_vec())
        .map_err(value_error)
}

/// Propagate from a calendar date string.
///
/// Returns ([[mjd, x, y, z, vx, vy, vz], ...], [a, e, i, raan, aop, ma]).
#[pyfunction]
fn propagate(
    date: &str,
    elements: Vec<f64>,
    step_s: f64,
    duration_s: f64,
) -> PyResult<(Vec<Vec<f64>>, Vec<f64>)> {
    let epoch0 = epoch::date_to_mjd(date).map_err(value_error)?;
    let elements0 = KeplerianElements::from_degrees_slice(&elements).map_err(value_error)?;
    let out = crate::propagator::propagate(epoch0, &elements0, step_s, duration_s).map_err(value_error)?;
    Ok((ephemeris_rows(&out.ephemeris), out.final_elements.to_degrees().to_vec()))
}

pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyKeplerianElements>()?;
    m.add_class::<PyPropagator>()?;
    m.add_function(wrap_pyfunction!(date_to_mjd, m)?)?;
    m.add_function(wrap_pyfunction!(mjd_to_date, m)?)?;
    m.add_function(wrap_pyfunction!(keplerian_to_cartesian, m)?)?;
    m.add_function(wrap_pyfunction!(cartesian_to_keplerian, m)?)?;
    m.add_function(wrap_pyfunction!(propagate, m)?)?;
    m.add("MU_EARTH", constants::MU_EARTH)?;
    m.add("R_EARTH", constants::R_EARTH)?;
    Ok(())
}
