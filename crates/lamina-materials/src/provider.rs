//! Material property provider trait.
//!
//! Every material data source (tabulated tables, dispersion formulas,
//! built-in library entries) implements [`MaterialProvider`], which returns
//! the wavelength-dependent complex refractive index $\tilde{n} = n + ik$.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use num_complex::Complex64;
use thiserror::Error;

/// Errors from material providers.
///
/// Any of these means no usable refractive index could be produced.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Material not found: {0}")]
    NotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Failed to read material file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed material document: {0}")]
    Document(String),

    #[error("Dispersion formula {0} is not supported")]
    UnsupportedFormula(String),

    #[error("Negative extinction coefficient k = {k} at {wavelength_nm} nm (gain media are not supported)")]
    NegativeExtinction { wavelength_nm: f64, k: f64 },

    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Provides wavelength-dependent optical constants.
///
/// Implementations include tabulated $(\lambda, n, k)$ data and closed-form
/// dispersion formulas. Wavelengths are always in nanometres.
pub trait MaterialProvider: Send + Sync {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the data is valid (nm).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Complex dielectric function $\epsilon(\lambda)$.
    ///
    /// Default implementation derives from $\epsilon = \tilde{n}^2$.
    fn dielectric_function(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        let n = self.refractive_index(wavelength_nm)?;
        Ok(n * n)
    }
}

/// Build a complex index from `(n, k)`, rejecting gain.
///
/// `k = 0` yields a purely real index.
pub fn complex_index(n: f64, k: f64, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
    if k < 0.0 {
        return Err(MaterialError::NegativeExtinction { wavelength_nm, k });
    }
    if !n.is_finite() || !k.is_finite() {
        return Err(MaterialError::DataError(format!(
            "non-finite optical constants (n = {}, k = {}) at {} nm",
            n, k, wavelength_nm
        )));
    }
    Ok(Complex64::new(n, k))
}

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for a loaded table or formula.
///
/// Never reused, so cached indices cannot outlive the material they were
/// computed for.
pub(crate) fn next_material_id() -> u64 {
    NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)
}

/// Unit heuristic shared by tables and declared ranges: values below 20 are
/// micrometres, anything else is already nanometres.
pub(crate) fn to_nanometres(first_value: f64) -> f64 {
    if first_value < 20.0 {
        1000.0
    } else {
        1.0
    }
}
