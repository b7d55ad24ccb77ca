//! Spectrum runs over a wavelength grid.
//!
//! [`SpectrumCalculator`] checks every material's valid range against the
//! grid, evaluates the stack at each wavelength in order, and reports
//! progress at a fixed cadence. Any material failure aborts the run; partial
//! spectra are never returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lamina_materials::{MaterialError, MaterialResolver};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stack::LayerStack;
use crate::tmm::{TmmError, TransferMatrixEngine};
use crate::types::{CalculationRequest, Polarization, RequestError};

/// Progress is reported every this many wavelengths by default.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

/// Errors that abort a spectrum run.
#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("Invalid calculation request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("Cannot determine valid range of material '{label}': {source}")]
    Range {
        label: String,
        #[source]
        source: MaterialError,
    },

    #[error(transparent)]
    Tmm(#[from] TmmError),

    #[error("Calculation cancelled after {completed} of {total} wavelengths")]
    Cancelled { completed: usize, total: usize },
}

/// A material whose data does not cover the whole grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicMaterial {
    pub label: String,
    pub range_min_nm: f64,
    pub range_max_nm: f64,
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub polarization: Polarization,
    pub angle_deg: f64,
    pub wavelengths_nm: Vec<f64>,
    pub reflectance: Vec<f64>,
    pub transmittance: Vec<f64>,
    pub absorptance: Vec<f64>,
    pub problematic_materials: Vec<ProblematicMaterial>,
    pub warnings: Vec<String>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.wavelengths_nm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths_nm.is_empty()
    }

    /// Index and value of the highest reflectance.
    pub fn peak_reflectance(&self) -> Option<(usize, f64)> {
        self.reflectance
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Shared flag for cooperative cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives the transfer-matrix engine across a wavelength grid.
#[derive(Debug, Clone)]
pub struct SpectrumCalculator {
    engine: TransferMatrixEngine,
    progress_interval: usize,
}

impl Default for SpectrumCalculator {
    fn default() -> Self {
        Self {
            engine: TransferMatrixEngine::new(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SpectrumCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress every `interval` wavelengths (at least 1).
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Compute the spectrum of `stack` for `request`.
    ///
    /// `on_progress` receives percentages in increasing order and always
    /// ends with 100 on success.
    pub fn run(
        &self,
        stack: &LayerStack,
        request: &CalculationRequest,
        resolver: &mut MaterialResolver,
        on_progress: &mut dyn FnMut(u32),
    ) -> Result<Spectrum, SpectrumError> {
        self.run_cancellable(stack, request, resolver, on_progress, &CancelToken::new())
    }

    /// As [`run`](Self::run), checking `cancel` before each wavelength.
    pub fn run_cancellable(
        &self,
        stack: &LayerStack,
        request: &CalculationRequest,
        resolver: &mut MaterialResolver,
        on_progress: &mut dyn FnMut(u32),
        cancel: &CancelToken,
    ) -> Result<Spectrum, SpectrumError> {
        request.validate()?;
        let grid = request.grid.values();
        let total = grid.len();

        let problematic = self.problematic_materials(stack, request, resolver)?;
        let mut warnings: Vec<String> = problematic
            .iter()
            .map(|p| {
                format!(
                    "Material '{}' has data for {}-{} nm only; values outside are extrapolated",
                    p.label, p.range_min_nm, p.range_max_nm
                )
            })
            .collect();

        let angle_rad = request.angle_rad();
        let mut reflectance = Vec::with_capacity(total);
        let mut transmittance = Vec::with_capacity(total);
        let mut absorptance = Vec::with_capacity(total);
        let mut clamped = 0usize;

        for (i, &wavelength_nm) in grid.iter().enumerate() {
            if cancel.is_cancelled() {
                log::debug!("Spectrum run cancelled at {}/{}", i, total);
                return Err(SpectrumError::Cancelled {
                    completed: i,
                    total,
                });
            }

            let res = self.engine.evaluate(
                stack,
                wavelength_nm,
                angle_rad,
                request.polarization,
                resolver,
            )?;
            if res.reflectance_clamped {
                clamped += 1;
            }
            reflectance.push(res.reflectance);
            transmittance.push(res.transmittance);
            absorptance.push(res.absorptance);

            let done = i + 1;
            if done % self.progress_interval == 0 && done < total {
                on_progress((done * 100 / total) as u32);
            }
        }
        on_progress(100);

        if clamped > 0 {
            let message = format!(
                "Reflectance exceeded 1 at {} wavelength(s) and was clamped",
                clamped
            );
            log::warn!("{}", message);
            warnings.push(message);
        }

        let (hits, misses) = resolver.cache().stats();
        log::debug!(
            "Computed {} wavelengths ({}-pol, {}°) over {} layers; index cache {} hits / {} misses",
            total,
            request.polarization,
            request.angle_deg,
            stack.len(),
            hits,
            misses
        );

        Ok(Spectrum {
            polarization: request.polarization,
            angle_deg: request.angle_deg,
            wavelengths_nm: grid.to_vec(),
            reflectance,
            transmittance,
            absorptance,
            problematic_materials: problematic,
            warnings,
        })
    }

    /// Materials whose valid range does not cover `[grid.start, grid.end]`.
    pub fn problematic_materials(
        &self,
        stack: &LayerStack,
        request: &CalculationRequest,
        resolver: &MaterialResolver,
    ) -> Result<Vec<ProblematicMaterial>, SpectrumError> {
        let (start, end) = (request.grid.start(), request.grid.end());
        let mut out = Vec::new();
        for (label, material) in stack.distinct_materials() {
            let range = resolver
                .valid_range(material)
                .map_err(|source| SpectrumError::Range {
                    label: label.to_string(),
                    source,
                })?;
            if let Some((lo, hi)) = range {
                if lo > start || hi < end {
                    log::warn!(
                        "Material '{}' covers {}-{} nm but the grid spans {}-{} nm",
                        label,
                        lo,
                        hi,
                        start,
                        end
                    );
                    out.push(ProblematicMaterial {
                        label: label.to_string(),
                        range_min_nm: lo,
                        range_max_nm: hi,
                    });
                }
            }
        }
        Ok(out)
    }
}
