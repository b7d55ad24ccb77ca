//! Fresnel amplitude coefficients and interface matrices.

use num_complex::Complex64;

use super::matrix::Mat2;
use crate::types::Polarization;

/// Amplitude reflection and transmission of one interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fresnel {
    pub r: Complex64,
    pub t: Complex64,
}

/// Coefficients for light going from medium `i` into medium `f`.
///
/// `cos_i` and `cos_f` are the (complex) propagation-angle cosines in each
/// medium as given by [`super::snell::layer_cosine`].
pub fn coefficients(
    polarization: Polarization,
    n_i: Complex64,
    n_f: Complex64,
    cos_i: Complex64,
    cos_f: Complex64,
) -> Fresnel {
    match polarization {
        Polarization::S => {
            let a = n_i * cos_i;
            let b = n_f * cos_f;
            Fresnel {
                r: (a - b) / (a + b),
                t: 2.0 * a / (a + b),
            }
        }
        Polarization::P => {
            let a = n_f * cos_i;
            let b = n_i * cos_f;
            Fresnel {
                r: (a - b) / (a + b),
                t: 2.0 * n_i * cos_i / (a + b),
            }
        }
    }
}

/// Interface matrix $\frac{1}{t}\begin{pmatrix}1 & r\\ r & 1\end{pmatrix}$.
pub fn interface_matrix(coeffs: Fresnel) -> Mat2 {
    let one = Complex64::new(1.0, 0.0);
    Mat2::new(one, coeffs.r, coeffs.r, one).scale(one / coeffs.t)
}
