//! Tabulated $(\lambda, n, k)$ materials.
//!
//! Rows are sorted by wavelength on construction. Inside the table, $n$ and
//! $k$ are interpolated linearly and independently; outside it the nearest
//! boundary row is used as-is (flat extrapolation).
//!
//! Text tables are whitespace separated, one row per line. When the first
//! wavelength is below 20 the whole table is taken to be in micrometres,
//! otherwise in nanometres.

use num_complex::Complex64;

use crate::interp::LinearInterpolator;
use crate::provider::{
    complex_index, next_material_id, to_nanometres, MaterialError, MaterialProvider,
};

/// Material backed by a table of optical constants.
#[derive(Debug, Clone)]
pub struct TabulatedMaterial {
    id: u64,
    name: String,
    n: LinearInterpolator,
    k: LinearInterpolator,
}

impl TabulatedMaterial {
    /// Construct from `(λ/nm, n, k)` rows in any order.
    ///
    /// # Errors
    /// Fails on an empty table, duplicate wavelengths, non-finite values or
    /// negative `k`.
    pub fn from_rows(
        name: impl Into<String>,
        rows: &[(f64, f64, f64)],
    ) -> Result<Self, MaterialError> {
        let mut rows = rows.to_vec();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(&(lam, _, k)) = rows.iter().find(|&&(_, _, k)| k < 0.0) {
            return Err(MaterialError::NegativeExtinction {
                wavelength_nm: lam,
                k,
            });
        }

        let wavelengths_nm: Vec<f64> = rows.iter().map(|&(lam, _, _)| lam).collect();
        let n_values: Vec<f64> = rows.iter().map(|&(_, n, _)| n).collect();
        let k_values: Vec<f64> = rows.iter().map(|&(_, _, k)| k).collect();

        Ok(Self {
            id: next_material_id(),
            name: name.into(),
            n: LinearInterpolator::new(wavelengths_nm.clone(), n_values)?,
            k: LinearInterpolator::new(wavelengths_nm, k_values)?,
        })
    }

    /// Parse a `wavelength n k` table.
    pub fn parse_nk(name: impl Into<String>, text: &str) -> Result<Self, MaterialError> {
        let rows = parse_columns(text, 3)?;
        let rows: Vec<(f64, f64, f64)> = rows.iter().map(|r| (r[0], r[1], r[2])).collect();
        Self::from_rows(name, &rows)
    }

    /// Parse a `wavelength n` table (lossless, `k = 0`).
    pub fn parse_n(name: impl Into<String>, text: &str) -> Result<Self, MaterialError> {
        let rows = parse_columns(text, 2)?;
        let rows: Vec<(f64, f64, f64)> = rows.iter().map(|r| (r[0], r[1], 0.0)).collect();
        Self::from_rows(name, &rows)
    }

    /// Identity of this table; clones share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Tabulated wavelengths (nm), ascending.
    pub fn wavelengths_nm(&self) -> &[f64] {
        self.n.knots()
    }

    /// Interpolated `(n, k)` with flat extrapolation.
    pub fn nk(&self, wavelength_nm: f64) -> (f64, f64) {
        (self.n.evaluate(wavelength_nm), self.k.evaluate(wavelength_nm))
    }
}

impl MaterialProvider for TabulatedMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.n.range()
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        let (lo, hi) = self.wavelength_range();
        if wavelength_nm < lo || wavelength_nm > hi {
            log::debug!(
                "{}: {:.1} nm outside [{}, {}] nm, using boundary value",
                self.name,
                wavelength_nm,
                lo,
                hi
            );
        }
        let (n, k) = self.nk(wavelength_nm);
        complex_index(n, k, wavelength_nm)
    }
}

/// Extinction-only table (`wavelength k`) paired with a formula or an
/// `n` table in the same document.
#[derive(Debug, Clone)]
pub struct ExtinctionTable {
    k: LinearInterpolator,
}

impl ExtinctionTable {
    /// Parse a `wavelength k` table.
    pub fn parse(text: &str) -> Result<Self, MaterialError> {
        let rows = parse_columns(text, 2)?;
        if let Some(row) = rows.iter().find(|r| r[1] < 0.0) {
            return Err(MaterialError::NegativeExtinction {
                wavelength_nm: row[0],
                k: row[1],
            });
        }
        let mut rows = rows;
        rows.sort_by(|a, b| a[0].total_cmp(&b[0]));
        let xs = rows.iter().map(|r| r[0]).collect();
        let ys = rows.iter().map(|r| r[1]).collect();
        Ok(Self {
            k: LinearInterpolator::new(xs, ys)?,
        })
    }

    pub fn range(&self) -> (f64, f64) {
        self.k.range()
    }

    pub fn wavelengths_nm(&self) -> &[f64] {
        self.k.knots()
    }

    pub fn k(&self, wavelength_nm: f64) -> f64 {
        self.k.evaluate(wavelength_nm)
    }
}

/// Parse whitespace-separated rows, converting the first column to nm.
fn parse_columns(text: &str, columns: usize) -> Result<Vec<Vec<f64>>, MaterialError> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < columns {
            return Err(MaterialError::DataError(format!(
                "line {}: expected {} columns, got '{}'",
                idx + 1,
                columns,
                line
            )));
        }
        let mut row = Vec::with_capacity(columns);
        for part in &parts[..columns] {
            let value: f64 = part.parse().map_err(|_| {
                MaterialError::DataError(format!("line {}: invalid number '{}'", idx + 1, part))
            })?;
            row.push(value);
        }
        rows.push(row);
    }

    let first = rows
        .first()
        .map(|r| r[0])
        .ok_or_else(|| MaterialError::DataError("table contains no rows".into()))?;
    let scale = to_nanometres(first);
    for row in &mut rows {
        row[0] *= scale;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> TabulatedMaterial {
        TabulatedMaterial::from_rows(
            "sample",
            &[(400.0, 1.50, 0.02), (500.0, 1.48, 0.01), (700.0, 1.46, 0.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_table_row_is_reproduced_exactly() {
        let mat = sample();
        let n = mat.refractive_index(500.0).unwrap();
        assert_abs_diff_eq!(n.re, 1.48, epsilon = 1e-12);
        assert_abs_diff_eq!(n.im, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let a = sample();
        let b = TabulatedMaterial::from_rows(
            "shuffled",
            &[(700.0, 1.46, 0.0), (400.0, 1.50, 0.02), (500.0, 1.48, 0.01)],
        )
        .unwrap();
        for wl in [380.0, 400.0, 450.0, 600.0, 750.0] {
            assert_eq!(a.nk(wl), b.nk(wl));
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let mat = sample();
        assert_eq!(mat.nk(350.0), (1.50, 0.02));
        assert_eq!(mat.nk(900.0), (1.46, 0.0));
    }

    #[test]
    fn test_micrometre_table_is_converted() {
        let text = "0.4 1.50 0.0\n0.5 1.48 0.0\n0.6 1.47 0.0\n";
        let mat = TabulatedMaterial::parse_nk("um", text).unwrap();
        assert_eq!(mat.wavelength_range(), (400.0, 600.0));
        assert_abs_diff_eq!(mat.nk(450.0).0, 1.49, epsilon = 1e-12);
    }

    #[test]
    fn test_nanometre_table_is_kept() {
        let text = "400 2.0\n800 1.8\n";
        let mat = TabulatedMaterial::parse_n("nm", text).unwrap();
        assert_eq!(mat.wavelength_range(), (400.0, 800.0));
        assert_eq!(mat.nk(600.0).1, 0.0);
    }

    #[test]
    fn test_rejects_negative_k() {
        let err = TabulatedMaterial::from_rows("gain", &[(500.0, 1.5, -0.1)]).unwrap_err();
        assert!(matches!(err, MaterialError::NegativeExtinction { .. }));
    }

    #[test]
    fn test_rejects_short_rows() {
        let err = TabulatedMaterial::parse_nk("bad", "0.5 1.5\n").unwrap_err();
        assert!(matches!(err, MaterialError::DataError(_)));
    }

    #[test]
    fn test_rejects_empty_table() {
        assert!(TabulatedMaterial::parse_nk("empty", "\n  \n").is_err());
    }

    #[test]
    fn test_extinction_table() {
        let table = ExtinctionTable::parse("0.3 0.1\n0.5 0.0\n").unwrap();
        assert_eq!(table.range(), (300.0, 500.0));
        assert_abs_diff_eq!(table.k(400.0), 0.05, epsilon = 1e-12);
        assert_eq!(table.k(200.0), 0.1);
    }
}
