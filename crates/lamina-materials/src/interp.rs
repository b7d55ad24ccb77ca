//! Piecewise-linear interpolation with flat extrapolation.
//!
//! Tabulated optical constants are sampled at discrete wavelengths. Between
//! samples the value is interpolated linearly; outside the sampled range the
//! nearest boundary value is returned unchanged. Slopes are never extended
//! past the table ends.

use crate::provider::MaterialError;

/// Linear interpolator over strictly increasing knots.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    /// Sorted x values (knots).
    xs: Vec<f64>,
    /// Corresponding y values.
    ys: Vec<f64>,
}

impl LinearInterpolator {
    /// Construct an interpolator from data points.
    ///
    /// # Arguments
    /// * `xs` - Strictly increasing x values.
    /// * `ys` - Corresponding y values (same length as `xs`).
    ///
    /// # Errors
    /// Returns [`MaterialError::DataError`] if the lengths differ, no points
    /// are given, a value is not finite, or `xs` is not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::DataError(format!(
                "xs and ys must have equal length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }
        if xs.is_empty() {
            return Err(MaterialError::DataError("empty dataset".into()));
        }
        if let Some(bad) = xs.iter().chain(ys.iter()).find(|v| !v.is_finite()) {
            return Err(MaterialError::DataError(format!(
                "non-finite value {} in dataset",
                bad
            )));
        }
        for i in 1..xs.len() {
            if xs[i] <= xs[i - 1] {
                return Err(MaterialError::DataError(format!(
                    "wavelengths must be strictly increasing (index {}: {} after {})",
                    i,
                    xs[i],
                    xs[i - 1]
                )));
            }
        }
        Ok(Self { xs, ys })
    }

    /// Lowest and highest knot.
    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn knots(&self) -> &[f64] {
        &self.xs
    }

    /// Evaluate at `x`, clamping to the boundary values outside the knots.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        // Binary search for the enclosing interval
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let b = (x - self.xs[lo]) / h;
        self.ys[lo] + b * (self.ys[hi] - self.ys[lo])
    }
}
