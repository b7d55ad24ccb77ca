//! 2x2 complex matrices for transfer-matrix products.

use std::ops::{Mul, MulAssign};

use num_complex::Complex64;

/// Row-major 2x2 complex matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2 {
    pub m: [[Complex64; 2]; 2],
}

impl Mat2 {
    pub fn new(m00: Complex64, m01: Complex64, m10: Complex64, m11: Complex64) -> Self {
        Self {
            m: [[m00, m01], [m10, m11]],
        }
    }

    pub fn identity() -> Self {
        let one = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        Self::new(one, zero, zero, one)
    }

    pub fn diagonal(d0: Complex64, d1: Complex64) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self::new(d0, zero, zero, d1)
    }

    /// Multiply every element by `s`.
    pub fn scale(self, s: Complex64) -> Self {
        Self::new(
            self.m[0][0] * s,
            self.m[0][1] * s,
            self.m[1][0] * s,
            self.m[1][1] * s,
        )
    }

    pub fn determinant(&self) -> Complex64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|z| z.is_finite())
    }
}

impl Mul for Mat2 {
    type Output = Mat2;

    fn mul(self, rhs: Mat2) -> Mat2 {
        let a = &self.m;
        let b = &rhs.m;
        Mat2::new(
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        )
    }
}

impl MulAssign for Mat2 {
    fn mul_assign(&mut self, rhs: Mat2) {
        *self = *self * rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_identity_is_neutral() {
        let a = Mat2::new(c(1.0, 2.0), c(3.0, -1.0), c(0.5, 0.0), c(-2.0, 1.0));
        assert_eq!(a * Mat2::identity(), a);
        assert_eq!(Mat2::identity() * a, a);
    }

    #[test]
    fn test_product_matches_hand_computation() {
        let a = Mat2::new(c(1.0, 0.0), c(2.0, 0.0), c(3.0, 0.0), c(4.0, 0.0));
        let b = Mat2::new(c(0.0, 1.0), c(1.0, 0.0), c(1.0, 0.0), c(0.0, -1.0));
        let p = a * b;
        assert_eq!(p.m[0][0], c(2.0, 1.0));
        assert_eq!(p.m[0][1], c(1.0, -2.0));
        assert_eq!(p.m[1][0], c(4.0, 3.0));
        assert_eq!(p.m[1][1], c(3.0, -4.0));
    }

    #[test]
    fn test_determinant_is_multiplicative() {
        let a = Mat2::new(c(1.0, 1.0), c(2.0, 0.0), c(0.0, 3.0), c(1.0, -1.0));
        let b = Mat2::diagonal(c(2.0, 0.0), c(0.0, 0.5));
        let lhs = (a * b).determinant();
        let rhs = a.determinant() * b.determinant();
        assert!((lhs - rhs).norm() < 1e-12);
    }

    #[test]
    fn test_mul_assign() {
        let mut a = Mat2::diagonal(c(2.0, 0.0), c(3.0, 0.0));
        a *= Mat2::diagonal(c(0.5, 0.0), c(1.0, 1.0));
        assert_eq!(a, Mat2::diagonal(c(1.0, 0.0), c(3.0, 3.0)));
    }
}
