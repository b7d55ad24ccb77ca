//! Closed-form dispersion formulas.
//!
//! The nine formula kinds follow the refractiveindex.info numbering. All of
//! them take the wavelength in micrometres and a coefficient list
//! $C_1 \dots C_n$ (stored zero-based here, so `c[0]` is $C_1$).
//!
//! | Kind | Name | Form |
//! |------|------|------|
//! | 1 | Sellmeier | $n^2 - 1 = C_1 + \sum C_{2i}\lambda^2/(\lambda^2 - C_{2i+1}^2)$ |
//! | 2 | Sellmeier-2 | $n^2 - 1 = C_1 + \sum C_{2i}\lambda^2/(\lambda^2 - C_{2i+1})$ |
//! | 3 | Polynomial | $n^2 = C_1 + \sum C_{2i}\lambda^{C_{2i+1}}$ |
//! | 4 | RefractiveIndex.INFO | two resonance terms plus a polynomial tail |
//! | 5 | Cauchy | $n = C_1 + \sum C_{2i}\lambda^{C_{2i+1}}$ |
//! | 6 | Gases | $n - 1 = C_1 + \sum C_{2i}/(C_{2i+1} - \lambda^{-2})$ |
//! | 7 | Herzberger | $n = C_1 + C_2 L + C_3 L^2 + C_4\lambda^2 + C_5\lambda^4 + C_6\lambda^6$, $L = 1/(\lambda^2 - 0.028)$ |
//! | 8 | Retro | $(n^2-1)/(n^2+2) = C_1 + C_2\lambda^2/(\lambda^2 - C_3) + C_4\lambda^2$ |
//! | 9 | Exotic | $n^2 = C_1 + C_2/(\lambda^2 - C_3) + C_4(\lambda - C_5)/((\lambda - C_5)^2 + C_6)$ |
//!
//! A formula's declared range is advisory: evaluating outside it logs a
//! warning and still returns a value.

use std::sync::atomic::{AtomicBool, Ordering};

use num_complex::Complex64;

use crate::provider::{complex_index, next_material_id, MaterialError, MaterialProvider};
use crate::tabulated::ExtinctionTable;

/// Dispersion formula kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Sellmeier,
    Sellmeier2,
    Polynomial,
    RefractiveIndexInfo,
    Cauchy,
    Gases,
    Herzberger,
    Retro,
    Exotic,
}

impl FormulaKind {
    /// Map a refractiveindex.info formula number (1–9) to its kind.
    pub fn from_number(number: u32) -> Result<Self, MaterialError> {
        Ok(match number {
            1 => Self::Sellmeier,
            2 => Self::Sellmeier2,
            3 => Self::Polynomial,
            4 => Self::RefractiveIndexInfo,
            5 => Self::Cauchy,
            6 => Self::Gases,
            7 => Self::Herzberger,
            8 => Self::Retro,
            9 => Self::Exotic,
            other => return Err(MaterialError::UnsupportedFormula(other.to_string())),
        })
    }

    pub fn number(self) -> u32 {
        match self {
            Self::Sellmeier => 1,
            Self::Sellmeier2 => 2,
            Self::Polynomial => 3,
            Self::RefractiveIndexInfo => 4,
            Self::Cauchy => 5,
            Self::Gases => 6,
            Self::Herzberger => 7,
            Self::Retro => 8,
            Self::Exotic => 9,
        }
    }
}

/// A dispersion formula with its coefficients.
#[derive(Debug, Clone)]
pub struct DispersionFormula {
    pub kind: FormulaKind,
    pub coefficients: Vec<f64>,
}

impl DispersionFormula {
    pub fn new(kind: FormulaKind, coefficients: Vec<f64>) -> Result<Self, MaterialError> {
        if coefficients.is_empty() {
            return Err(MaterialError::DataError(format!(
                "formula {} has no coefficients",
                kind.number()
            )));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(MaterialError::DataError(format!(
                "formula {} has non-finite coefficients",
                kind.number()
            )));
        }
        Ok(Self { kind, coefficients })
    }

    /// Real refractive index at `wavelength_nm`.
    ///
    /// # Errors
    /// Returns [`MaterialError::DataError`] when the formula yields a
    /// non-physical value ($n^2 \le 0$ or non-finite) at this wavelength.
    pub fn evaluate(&self, wavelength_nm: f64) -> Result<f64, MaterialError> {
        let lam = wavelength_nm / 1000.0;
        let l2 = lam * lam;
        let c = |i: usize| self.coefficients.get(i).copied().unwrap_or(0.0);

        let n = match self.kind {
            FormulaKind::Sellmeier => {
                let n2 = 1.0
                    + c(0)
                    + self.tail(1)
                        .chunks_exact(2)
                        .map(|p| p[0] * l2 / (l2 - p[1] * p[1]))
                        .sum::<f64>();
                self.sqrt_n2(n2, wavelength_nm)?
            }
            FormulaKind::Sellmeier2 => {
                let n2 = 1.0
                    + c(0)
                    + self.tail(1)
                        .chunks_exact(2)
                        .map(|p| p[0] * l2 / (l2 - p[1]))
                        .sum::<f64>();
                self.sqrt_n2(n2, wavelength_nm)?
            }
            FormulaKind::Polynomial => {
                let n2 = c(0) + power_series(self.tail(1), lam);
                self.sqrt_n2(n2, wavelength_nm)?
            }
            FormulaKind::RefractiveIndexInfo => {
                let n2 = c(0)
                    + c(1) * lam.powf(c(2)) / (l2 - c(3).powf(c(4)))
                    + c(5) * lam.powf(c(6)) / (l2 - c(7).powf(c(8)))
                    + power_series(self.tail(9), lam);
                self.sqrt_n2(n2, wavelength_nm)?
            }
            FormulaKind::Cauchy => c(0) + power_series(self.tail(1), lam),
            FormulaKind::Gases => {
                1.0 + c(0)
                    + self.tail(1)
                        .chunks_exact(2)
                        .map(|p| p[0] / (p[1] - 1.0 / l2))
                        .sum::<f64>()
            }
            FormulaKind::Herzberger => {
                let big_l = 1.0 / (l2 - 0.028);
                c(0) + c(1) * big_l
                    + c(2) * big_l * big_l
                    + c(3) * l2
                    + c(4) * l2 * l2
                    + c(5) * l2 * l2 * l2
            }
            FormulaKind::Retro => {
                let rhs = c(0) + c(1) * l2 / (l2 - c(2)) + c(3) * l2;
                let n2 = (1.0 + 2.0 * rhs) / (1.0 - rhs);
                self.sqrt_n2(n2, wavelength_nm)?
            }
            FormulaKind::Exotic => {
                let d = lam - c(4);
                let n2 = c(0) + c(1) / (l2 - c(2)) + c(3) * d / (d * d + c(5));
                self.sqrt_n2(n2, wavelength_nm)?
            }
        };

        if !n.is_finite() {
            return Err(MaterialError::DataError(format!(
                "formula {} is singular at {} nm",
                self.kind.number(),
                wavelength_nm
            )));
        }
        Ok(n)
    }

    fn tail(&self, from: usize) -> &[f64] {
        self.coefficients.get(from..).unwrap_or(&[])
    }

    fn sqrt_n2(&self, n2: f64, wavelength_nm: f64) -> Result<f64, MaterialError> {
        if !(n2 > 0.0) || !n2.is_finite() {
            return Err(MaterialError::DataError(format!(
                "formula {} gives n² = {} at {} nm",
                self.kind.number(),
                n2,
                wavelength_nm
            )));
        }
        Ok(n2.sqrt())
    }
}

/// $\sum C_{2i}\lambda^{C_{2i+1}}$ over coefficient pairs.
fn power_series(pairs: &[f64], lam: f64) -> f64 {
    pairs
        .chunks_exact(2)
        .map(|p| p[0] * lam.powf(p[1]))
        .sum()
}

/// Material described by a dispersion formula, optionally paired with a
/// tabulated extinction coefficient.
#[derive(Debug)]
pub struct FormulaMaterial {
    id: u64,
    name: String,
    formula: DispersionFormula,
    /// Declared validity range in nm, if the source provides one.
    range_nm: Option<(f64, f64)>,
    extinction: Option<ExtinctionTable>,
    warned_out_of_range: AtomicBool,
}

impl FormulaMaterial {
    pub fn new(
        name: impl Into<String>,
        formula: DispersionFormula,
        range_nm: Option<(f64, f64)>,
    ) -> Self {
        Self {
            id: next_material_id(),
            name: name.into(),
            formula,
            range_nm,
            extinction: None,
            warned_out_of_range: AtomicBool::new(false),
        }
    }

    /// Attach a tabulated `k` to the formula's real index.
    pub fn with_extinction(mut self, table: ExtinctionTable) -> Self {
        self.extinction = Some(table);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn formula(&self) -> &DispersionFormula {
        &self.formula
    }

    pub fn declared_range(&self) -> Option<(f64, f64)> {
        self.range_nm
    }
}

impl MaterialProvider for FormulaMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        match (self.range_nm, self.extinction.as_ref().map(ExtinctionTable::range)) {
            (Some((lo, hi)), Some((klo, khi))) => (lo.max(klo), hi.min(khi)),
            (Some(range), None) => range,
            (None, Some(range)) => range,
            (None, None) => (0.0, f64::INFINITY),
        }
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        if let Some((lo, hi)) = self.range_nm {
            if (wavelength_nm < lo || wavelength_nm > hi)
                && !self.warned_out_of_range.swap(true, Ordering::Relaxed)
            {
                log::warn!(
                    "{}: {:.1} nm is outside the formula's valid range [{}, {}] nm; extrapolating",
                    self.name,
                    wavelength_nm,
                    lo,
                    hi
                );
            }
        }
        let n = self.formula.evaluate(wavelength_nm)?;
        let k = self
            .extinction
            .as_ref()
            .map_or(0.0, |table| table.k(wavelength_nm));
        complex_index(n, k, wavelength_nm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Malitson (1965) fused silica Sellmeier coefficients.
    fn fused_silica() -> DispersionFormula {
        DispersionFormula::new(
            FormulaKind::Sellmeier,
            vec![0.0, 0.6961663, 0.0684043, 0.4079426, 0.1162414, 0.8974794, 9.896161],
        )
        .unwrap()
    }

    #[test]
    fn test_sellmeier_fused_silica() {
        let f = fused_silica();
        // Reference: n(587.6 nm) = 1.4585
        assert_abs_diff_eq!(f.evaluate(587.6).unwrap(), 1.4585, epsilon = 2e-4);
        // Normal dispersion: index drops with wavelength
        assert!(f.evaluate(400.0).unwrap() > f.evaluate(800.0).unwrap());
    }

    #[test]
    fn test_cauchy() {
        // n = 1.5 + 0.004 λ⁻²
        let f = DispersionFormula::new(FormulaKind::Cauchy, vec![1.5, 0.004, -2.0]).unwrap();
        assert_abs_diff_eq!(f.evaluate(500.0).unwrap(), 1.5 + 0.004 / 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_polynomial_matches_constant() {
        let f = DispersionFormula::new(FormulaKind::Polynomial, vec![2.25]).unwrap();
        assert_abs_diff_eq!(f.evaluate(1000.0).unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sellmeier2_equivalent_to_sellmeier() {
        let s1 = fused_silica();
        let c = &s1.coefficients;
        let s2 = DispersionFormula::new(
            FormulaKind::Sellmeier2,
            vec![0.0, c[1], c[2] * c[2], c[3], c[4] * c[4], c[5], c[6] * c[6]],
        )
        .unwrap();
        for wl in [400.0, 632.8, 1064.0] {
            assert_abs_diff_eq!(s1.evaluate(wl).unwrap(), s2.evaluate(wl).unwrap(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gases_near_unity() {
        // Air (Ciddor-like two-term form)
        let f = DispersionFormula::new(
            FormulaKind::Gases,
            vec![0.0, 0.05792105, 238.0185, 0.00167917, 57.362],
        )
        .unwrap();
        let n = f.evaluate(550.0).unwrap();
        assert!(n > 1.0002 && n < 1.0004, "air index {}", n);
    }

    #[test]
    fn test_retro_zero_terms_gives_unity() {
        let f = DispersionFormula::new(FormulaKind::Retro, vec![0.0]).unwrap();
        assert_abs_diff_eq!(f.evaluate(500.0).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_n_squared_is_data_error() {
        let f = DispersionFormula::new(FormulaKind::Polynomial, vec![-1.0]).unwrap();
        assert!(matches!(f.evaluate(500.0), Err(MaterialError::DataError(_))));
    }

    #[test]
    fn test_unknown_formula_number() {
        assert!(matches!(
            FormulaKind::from_number(12),
            Err(MaterialError::UnsupportedFormula(_))
        ));
        assert_eq!(FormulaKind::from_number(7).unwrap(), FormulaKind::Herzberger);
    }

    #[test]
    fn test_out_of_range_still_evaluates() {
        let mat = FormulaMaterial::new("SiO2", fused_silica(), Some((210.0, 3710.0)));
        let n = mat.refractive_index(5000.0).unwrap();
        assert!(n.re > 1.0);
        assert_eq!(n.im, 0.0);
        assert_eq!(mat.wavelength_range(), (210.0, 3710.0));
    }

    #[test]
    fn test_extinction_table_adds_k() {
        let k = ExtinctionTable::parse("0.4 0.01\n0.8 0.03\n").unwrap();
        let mat = FormulaMaterial::new("lossy", fused_silica(), Some((300.0, 1000.0)))
            .with_extinction(k);
        let n = mat.refractive_index(600.0).unwrap();
        assert_abs_diff_eq!(n.im, 0.02, epsilon = 1e-12);
        assert_eq!(mat.wavelength_range(), (400.0, 800.0));
    }
}
