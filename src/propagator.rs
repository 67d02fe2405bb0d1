//! Analytic two-body propagation.
//!
//! Under pure Keplerian dynamics only the mean anomaly moves, at the constant
//! mean motion n = √(μ/a³). Each sample of the time grid advances M and runs
//! the element-to-state conversion; nothing else is integrated, so the output
//! is a pure function of the inputs.
//!
//! # Example
//! ```
//! use kepler_kernel::elements::KeplerianElements;
//! use kepler_kernel::epoch::date_to_mjd;
//! use kepler_kernel::propagator::propagate;
//!
//! let t0 = date_to_mjd("2000-01-01 00:00:00").unwrap();
//! let elems = KeplerianElements::from_degrees(7000.0, 0.001, 45.0, 90.0, 0.0, 0.0);
//! let out = propagate(t0, &elems, 600.0, 86_400.0).unwrap();
//! assert_eq!(out.ephemeris.len(), 145);
//! ```
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::elements::{normalize_angle, ElementError, KeplerianElements};
use crate::ephemeris::{Ephemeris, EphemerisPoint};
use crate::epoch::Epoch;
use crate::kepler::CartesianState;

/// Propagation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("Step must be positive and finite, got {0} s")]
    InvalidStep(f64),

    #[error("Duration must be non-negative and finite, got {0} s")]
    InvalidDuration(f64),

    #[error("Window must have finite bounds with end >= start, got MJD {start} to {end}")]
    InvalidWindow { start: f64, end: f64 },

    #[error("Time grid of {samples} samples exceeds the limit of {limit}")]
    TooManySamples { samples: u64, limit: usize },

    #[error(transparent)]
    Elements(#[from] ElementError),
}

/// Configuration for the two-body propagator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropagatorConfig {
    /// Largest time grid accepted, in samples.
    pub max_samples: usize,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        PropagatorConfig {
            max_samples: MAX_EPHEMERIS_SAMPLES,
        }
    }
}

impl PropagatorConfig {
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }
}

/// Propagation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Propagation {
    /// Time-stamped states, one per grid sample, increasing in epoch.
    pub ephemeris: Ephemeris,
    /// Elements at the last grid sample.
    pub final_elements: KeplerianElements,
    /// Sample indices whose Kepler solve hit the iteration cap.
    pub non_converged: Vec<usize>,
}

impl Propagation {
    /// True when every sample's Kepler solve converged.
    pub fn converged(&self) -> bool {
        self.non_converged.is_empty()
    }
}

/// Keplerian (two-body) propagator over a uniform time grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoBodyPropagator {
    pub config: PropagatorConfig,
}

impl TwoBodyPropagator {
    pub fn new(config: PropagatorConfig) -> Self {
        TwoBodyPropagator { config }
    }

    /// Number of samples for a grid `0, step, 2·step, … ≤ duration`.
    pub fn sample_count(&self, step_s: f64, duration_s: f64) -> Result<usize, PropagationError> {
        if !(step_s.is_finite() && step_s > 0.0) {
            return Err(PropagationError::InvalidStep(step_s));
        }
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(PropagationError::InvalidDuration(duration_s));
        }

        let samples = (duration_s / step_s).floor() + 1.0;
        if samples > self.config.max_samples as f64 {
            return Err(PropagationError::TooManySamples {
                samples: samples as u64,
                limit: self.config.max_samples,
            });
        }
        Ok(samples as usize)
    }

    /// Propagate `elements0` from `epoch0` over `duration_s` seconds in steps of `step_s`.
    ///
    /// Sample k sits at `epoch0 + k·step_s`; the last one is the largest
    /// multiple of the step not exceeding the duration. The sample at k = 0
    /// is exactly the direct conversion of `elements0`.
    pub fn propagate(
        &self,
        epoch0: Epoch,
        elements0: &KeplerianElements,
        step_s: f64,
        duration_s: f64,
    ) -> Result<Propagation, PropagationError> {
        self.sample_grid(epoch0, elements0, epoch0, 0.0, step_s, duration_s)
    }

    /// Propagate elements osculating at `element_epoch` over the absolute
    /// window `[start, end]` in steps of `step_s`.
    ///
    /// The window may lie before, around or after the element epoch; the
    /// mean anomaly moves by n·(t − element_epoch) with either sign.
    pub fn propagate_window(
        &self,
        element_epoch: Epoch,
        elements: &KeplerianElements,
        start: Epoch,
        end: Epoch,
        step_s: f64,
    ) -> Result<Propagation, PropagationError> {
        let bounds_finite = [element_epoch, start, end].iter().all(|t| t.mjd().is_finite());
        if !bounds_finite || end.mjd() < start.mjd() {
            return Err(PropagationError::InvalidWindow {
                start: start.mjd(),
                end: end.mjd(),
            });
        }

        // MJD differences carry rounding of about a microsecond; snap to whole
        // milliseconds so that a whole number of steps is not lost to the floor
        let snap = |secs: f64| (secs * 1e3).round() / 1e3;
        let offset_s = snap(start - element_epoch);
        let duration_s = snap(end - start);

        self.sample_grid(element_epoch, elements, start, offset_s, step_s, duration_s)
    }

    /// Sample k sits at `start + k·step_s`, `offset_s + k·step_s` seconds after
    /// the element epoch.
    fn sample_grid(
        &self,
        element_epoch: Epoch,
        elements: &KeplerianElements,
        start: Epoch,
        offset_s: f64,
        step_s: f64,
        duration_s: f64,
    ) -> Result<Propagation, PropagationError> {
        let samples = self.sample_count(step_s, duration_s)?;
        elements.validate()?;

        let n = elements.mean_motion();
        let mut points = Vec::with_capacity(samples);
        let mut non_converged = Vec::new();
        let mut current = *elements;

        for k in 0..samples {
            let elapsed = k as f64 * step_s;
            let t = offset_s + elapsed;
            current = elements.with_mean_anomaly(normalize_angle(elements.ma + n * t));

            let conversion = CartesianState::from_keplerian_checked(&current)?;
            if !conversion.converged() {
                non_converged.push(k);
            }

            points.push(EphemerisPoint {
                epoch: start.add_seconds(elapsed),
                state: conversion.state,
            });
        }

        tracing::debug!(
            samples,
            mean_motion = n,
            offset_s,
            non_converged = non_converged.len(),
            "two-body propagation from MJD {:.6} (elements at MJD {:.6})",
            start.mjd(),
            element_epoch.mjd()
        );

        Ok(Propagation {
            ephemeris: Ephemeris::from_sorted(points),
            final_elements: current,
            non_converged,
        })
    }

    /// Propagate many independent objects in parallel on the same grid.
    pub fn propagate_batch(
        &self,
        objects: &[(u32, Epoch, KeplerianElements)],
        step_s: f64,
        duration_s: f64,
    ) -> Vec<(u32, Result<Propagation, PropagationError>)> {
        objects
            .par_iter()
            .map(|(id, epoch0, elems)| (*id, self.propagate(*epoch0, elems, step_s, duration_s)))
            .collect()
    }
}

/// Propagate with the default configuration.
pub fn propagate(
    epoch0: Epoch,
    elements0: &KeplerianElements,
    step_s: f64,
    duration_s: f64,
) -> Result<Propagation, PropagationError> {
    TwoBodyPropagator::default().propagate(epoch0, elements0, step_s, duration_s)
}
