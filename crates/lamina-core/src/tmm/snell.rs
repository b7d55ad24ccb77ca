//! Snell's law across a multilayer with complex indices.
//!
//! The tangential wavevector $n_0 \sin\theta_0$ is conserved through every
//! interface, so each layer's angle follows from the entrance medium alone:
//! $\sin\theta_j = n_0 \sin\theta_0 / n_j$. With absorbing layers or beyond
//! the critical angle $\theta_j$ is complex.

use num_complex::Complex64;

/// Below this, the imaginary part of $n\cos\theta$ is treated as zero.
const FORWARD_EPS: f64 = 100.0 * f64::EPSILON;

/// $\cos\theta_j$ in a layer of index `n_layer` for light entering from
/// `n_entrance` at `theta_entrance` (radians).
///
/// The branch is chosen so the wave travels into the structure: the
/// z-component of the wavevector $n_j\cos\theta_j$ has a non-negative
/// imaginary part (decaying), or a positive real part when the imaginary
/// part vanishes.
pub fn layer_cosine(n_entrance: Complex64, theta_entrance: f64, n_layer: Complex64) -> Complex64 {
    let sin_layer = n_entrance * theta_entrance.sin() / n_layer;
    let cos_layer = (Complex64::new(1.0, 0.0) - sin_layer * sin_layer).sqrt();
    if is_forward(n_layer, cos_layer) {
        cos_layer
    } else {
        -cos_layer
    }
}

/// Cosines for every layer of a stack.
pub fn layer_cosines(indices: &[Complex64], theta_entrance: f64) -> Vec<Complex64> {
    let n0 = indices[0];
    indices
        .iter()
        .map(|&n| layer_cosine(n0, theta_entrance, n))
        .collect()
}

fn is_forward(n: Complex64, cos_theta: Complex64) -> bool {
    let kz = n * cos_theta;
    if kz.im.abs() > FORWARD_EPS * kz.norm().max(1.0) {
        kz.im > 0.0
    } else {
        kz.re > 0.0
    }
}
