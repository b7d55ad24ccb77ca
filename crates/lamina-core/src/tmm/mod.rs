//! Transfer Matrix Method for planar multilayers.
//!
//! For a stack of media $0, 1, \dots, N$ the system matrix is
//!
//! $$M = D_{01} P_1 D_{12} P_2 \cdots P_{N-1} D_{N-1,N}$$
//!
//! where $D_{j,j+1} = \frac{1}{t_{j,j+1}}\begin{pmatrix}1 & r_{j,j+1}\\ r_{j,j+1} & 1\end{pmatrix}$
//! is the interface matrix built from the Fresnel coefficients and
//! $P_j = \mathrm{diag}(e^{-i\delta_j}, e^{i\delta_j})$ propagates through
//! layer $j$ with phase $\delta_j = n_j k_0 \cos\theta_j\, d_j$,
//! $k_0 = 2\pi/\lambda$. Then $r = M_{10}/M_{00}$ and $t = 1/M_{00}$.
//!
//! Power coefficients:
//! - $R = |r|^2$
//! - $T = |t|^2 \,\mathrm{Re}(n_N\cos\theta_N) / \mathrm{Re}(n_0\cos\theta_0)$ (s)
//! - $T = |t|^2 \,\mathrm{Re}(n_N\cos\theta_N^*) / \mathrm{Re}(n_0\cos\theta_0^*)$ (p)
//! - $A = \max(0, 1 - R - T)$

pub mod fresnel;
pub mod matrix;
pub mod snell;

use std::f64::consts::PI;

use lamina_materials::{MaterialError, MaterialResolver};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stack::LayerStack;
use crate::types::Polarization;
use matrix::Mat2;

/// Largest attenuation exponent applied in one layer. Beyond this the layer
/// is opaque to working precision, and capping keeps `e^{Im δ}` finite.
const MAX_ATTENUATION: f64 = 35.0;

/// Errors from a single-wavelength evaluation.
#[derive(Debug, Error)]
pub enum TmmError {
    #[error("Cannot resolve material '{label}' at {wavelength_nm} nm: {source}")]
    Material {
        label: String,
        wavelength_nm: f64,
        #[source]
        source: MaterialError,
    },

    #[error("Non-finite {quantity} at {wavelength_nm} nm")]
    NumericalInstability {
        wavelength_nm: f64,
        quantity: &'static str,
    },

    #[error("Invalid layer data: {0}")]
    InvalidInput(String),
}

/// Optical response of a stack at one wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TmmResult {
    /// Amplitude reflection coefficient.
    pub r: Complex64,
    /// Amplitude transmission coefficient.
    pub t: Complex64,
    pub reflectance: f64,
    pub transmittance: f64,
    pub absorptance: f64,
    /// `true` when the computed reflectance exceeded 1 and was clamped.
    pub reflectance_clamped: bool,
}

/// Scalar transfer-matrix solver for s/p polarized plane waves.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferMatrixEngine;

impl TransferMatrixEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `stack` at one wavelength, resolving every layer's index.
    ///
    /// A reflectance above 1 (possible with an absorbing entrance medium) is
    /// clamped to 1 and flagged in [`TmmResult::reflectance_clamped`]; this
    /// is only logged at debug level, so direct callers must check the flag.
    /// [`SpectrumCalculator`](crate::spectrum::SpectrumCalculator) turns it
    /// into a run warning.
    pub fn evaluate(
        &self,
        stack: &LayerStack,
        wavelength_nm: f64,
        angle_rad: f64,
        polarization: Polarization,
        resolver: &mut MaterialResolver,
    ) -> Result<TmmResult, TmmError> {
        let mut indices = Vec::with_capacity(stack.len());
        let mut thicknesses = Vec::with_capacity(stack.len());
        for layer in stack.layers() {
            let n = resolver
                .resolve(&layer.material, wavelength_nm)
                .map_err(|source| TmmError::Material {
                    label: layer.label.clone(),
                    wavelength_nm,
                    source,
                })?;
            indices.push(n);
            thicknesses.push(layer.thickness_nm);
        }
        self.evaluate_indices(&indices, &thicknesses, wavelength_nm, angle_rad, polarization)
    }

    /// Evaluate a stack given directly as indices and thicknesses (nm).
    ///
    /// The first and last entries are the semi-infinite media; their
    /// thicknesses are ignored.
    pub fn evaluate_indices(
        &self,
        indices: &[Complex64],
        thicknesses_nm: &[f64],
        wavelength_nm: f64,
        angle_rad: f64,
        polarization: Polarization,
    ) -> Result<TmmResult, TmmError> {
        if indices.len() < 2 {
            return Err(TmmError::InvalidInput(format!(
                "need at least 2 media, got {}",
                indices.len()
            )));
        }
        if indices.len() != thicknesses_nm.len() {
            return Err(TmmError::InvalidInput(format!(
                "{} indices but {} thicknesses",
                indices.len(),
                thicknesses_nm.len()
            )));
        }
        if !(wavelength_nm > 0.0) {
            return Err(TmmError::InvalidInput(format!(
                "wavelength must be positive, got {}",
                wavelength_nm
            )));
        }

        let k0 = 2.0 * PI / wavelength_nm;
        let cosines = snell::layer_cosines(indices, angle_rad);
        let last = indices.len() - 1;

        let mut m = Mat2::identity();
        for j in 0..last {
            if j > 0 && thicknesses_nm[j] > 0.0 {
                let kz = indices[j] * k0 * cosines[j];
                m *= propagation_matrix(kz * thicknesses_nm[j]);
            }
            let coeffs = fresnel::coefficients(
                polarization,
                indices[j],
                indices[j + 1],
                cosines[j],
                cosines[j + 1],
            );
            m *= fresnel::interface_matrix(coeffs);
        }

        if !m.is_finite() {
            return Err(TmmError::NumericalInstability {
                wavelength_nm,
                quantity: "system matrix",
            });
        }

        let r = m.m[1][0] / m.m[0][0];
        let t = Complex64::new(1.0, 0.0) / m.m[0][0];

        let (n_in, n_out) = (indices[0], indices[last]);
        let (c_in, c_out) = (cosines[0], cosines[last]);
        let impedance_ratio = match polarization {
            Polarization::S => (n_out * c_out).re / (n_in * c_in).re,
            Polarization::P => (n_out * c_out.conj()).re / (n_in * c_in.conj()).re,
        };

        let mut reflectance = r.norm_sqr();
        let transmittance = t.norm_sqr() * impedance_ratio;
        if !reflectance.is_finite() {
            return Err(TmmError::NumericalInstability {
                wavelength_nm,
                quantity: "reflectance",
            });
        }
        if !transmittance.is_finite() {
            return Err(TmmError::NumericalInstability {
                wavelength_nm,
                quantity: "transmittance",
            });
        }

        let reflectance_clamped = reflectance > 1.0;
        if reflectance_clamped {
            log::debug!(
                "R = {:.6} > 1 at {} nm, clamping to 1",
                reflectance,
                wavelength_nm
            );
            reflectance = 1.0;
        }
        let absorptance = (1.0 - reflectance - transmittance).max(0.0);

        Ok(TmmResult {
            r,
            t,
            reflectance,
            transmittance,
            absorptance,
            reflectance_clamped,
        })
    }
}

fn propagation_matrix(delta: Complex64) -> Mat2 {
    let delta = if delta.im > MAX_ATTENUATION {
        Complex64::new(delta.re, MAX_ATTENUATION)
    } else {
        delta
    };
    let i = Complex64::new(0.0, 1.0);
    Mat2::diagonal((-i * delta).exp(), (i * delta).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_bare_interface_matches_fresnel() {
        let engine = TransferMatrixEngine::new();
        let res = engine
            .evaluate_indices(&[c(1.0, 0.0), c(1.5, 0.0)], &[0.0, 0.0], 550.0, 0.0, Polarization::S)
            .unwrap();
        assert_abs_diff_eq!(res.reflectance, 0.04, epsilon = 1e-12);
        assert_abs_diff_eq!(res.transmittance, 0.96, epsilon = 1e-12);
        assert_abs_diff_eq!(res.absorptance, 0.0, epsilon = 1e-12);
        assert!(!res.reflectance_clamped);
    }

    #[test]
    fn test_zero_thickness_layer_is_transparent() {
        let engine = TransferMatrixEngine::new();
        let bare = engine
            .evaluate_indices(&[c(1.0, 0.0), c(1.5, 0.0)], &[0.0, 0.0], 600.0, 0.3, Polarization::P)
            .unwrap();
        let with_interface = engine
            .evaluate_indices(
                &[c(1.0, 0.0), c(2.1, 0.0), c(1.5, 0.0)],
                &[0.0, 0.0, 0.0],
                600.0,
                0.3,
                Polarization::P,
            )
            .unwrap();
        assert_abs_diff_eq!(bare.reflectance, with_interface.reflectance, epsilon = 1e-12);
        assert_abs_diff_eq!(bare.transmittance, with_interface.transmittance, epsilon = 1e-12);
    }

    #[test]
    fn test_half_wave_layer_is_absent() {
        // n·d = λ/2 leaves the bare-substrate reflectance unchanged.
        let engine = TransferMatrixEngine::new();
        let n_layer = 2.0;
        let d = 550.0 / (2.0 * n_layer);
        let res = engine
            .evaluate_indices(
                &[c(1.0, 0.0), c(n_layer, 0.0), c(1.5, 0.0)],
                &[0.0, d, 0.0],
                550.0,
                0.0,
                Polarization::S,
            )
            .unwrap();
        assert_abs_diff_eq!(res.reflectance, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_quarter_wave_antireflection() {
        // n1 = sqrt(n0 n2) at quarter-wave thickness cancels reflection.
        let engine = TransferMatrixEngine::new();
        let n_sub: f64 = 2.25;
        let n_ar = n_sub.sqrt();
        let d = 600.0 / (4.0 * n_ar);
        let res = engine
            .evaluate_indices(
                &[c(1.0, 0.0), c(n_ar, 0.0), c(n_sub, 0.0)],
                &[0.0, d, 0.0],
                600.0,
                0.0,
                Polarization::S,
            )
            .unwrap();
        assert_abs_diff_eq!(res.reflectance, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(res.transmittance, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_total_internal_reflection() {
        let engine = TransferMatrixEngine::new();
        for pol in [Polarization::S, Polarization::P] {
            let res = engine
                .evaluate_indices(
                    &[c(1.5, 0.0), c(1.0, 0.0)],
                    &[0.0, 0.0],
                    500.0,
                    60f64.to_radians(),
                    pol,
                )
                .unwrap();
            assert_abs_diff_eq!(res.reflectance, 1.0, epsilon = 1e-9);
            assert_abs_diff_eq!(res.transmittance, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_thick_metal_is_opaque() {
        let engine = TransferMatrixEngine::new();
        let res = engine
            .evaluate_indices(
                &[c(1.0, 0.0), c(0.2, 3.5), c(1.5, 0.0)],
                &[0.0, 5000.0, 0.0],
                600.0,
                0.0,
                Polarization::S,
            )
            .unwrap();
        assert!(res.transmittance < 1e-12);
        assert_abs_diff_eq!(res.reflectance + res.absorptance, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let engine = TransferMatrixEngine::new();
        assert!(matches!(
            engine.evaluate_indices(&[c(1.0, 0.0)], &[0.0], 500.0, 0.0, Polarization::S),
            Err(TmmError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.evaluate_indices(&[c(1.0, 0.0), c(1.5, 0.0)], &[0.0], 500.0, 0.0, Polarization::S),
            Err(TmmError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reflectance_above_one_is_clamped() {
        // Lossy entrance medium beyond the critical angle: |r|^2 is about 2.5.
        let engine = TransferMatrixEngine::new();
        let res = engine
            .evaluate_indices(
                &[c(1.5, 0.5), c(1.0, 0.0)],
                &[0.0, 0.0],
                550.0,
                45f64.to_radians(),
                Polarization::S,
            )
            .unwrap();
        assert!(res.r.norm_sqr() > 2.0);
        assert!(res.reflectance_clamped);
        assert_eq!(res.reflectance, 1.0);
        assert!(res.absorptance >= 0.0);
    }
}
