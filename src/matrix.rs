//! Affine transformation matrix.
//!
//! Maps user-space geometry into device space and, inverted, maps device
//! sample positions back into pattern space.

use core::ops::{Mul, MulAssign};

use crate::basics::{is_equal_eps, PointD};
use crate::error::{RasterError, Result};

/// Determinants closer to zero than this make a matrix non-invertible.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// 2D affine transform.
///
/// ```text
///   x' = x*xx + y*xy + x0
///   y' = x*yx + y*yy + y0
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        xx: 1.0,
        yx: 0.0,
        xy: 0.0,
        yy: 1.0,
        x0: 0.0,
        y0: 0.0,
    };

    pub const fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self {
            xx,
            yx,
            xy,
            yy,
            x0,
            y0,
        }
    }

    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `a` radians (clockwise on screen, where y points down).
    pub fn rotation(a: f64) -> Self {
        let (sa, ca) = a.sin_cos();
        Self::new(ca, sa, -sa, ca, 0.0, 0.0)
    }

    /// Skew by the angles `ax` and `ay` in radians.
    pub fn skewing(ax: f64, ay: f64) -> Self {
        Self::new(1.0, ay.tan(), ax.tan(), 1.0, 0.0, 0.0)
    }

    /// Matrix applying `a` first, then `b`.
    pub fn compose(a: &Matrix, b: &Matrix) -> Matrix {
        Matrix {
            xx: a.xx * b.xx + a.yx * b.xy,
            yx: a.xx * b.yx + a.yx * b.yy,
            xy: a.xy * b.xx + a.yy * b.xy,
            yy: a.xy * b.yx + a.yy * b.yy,
            x0: a.x0 * b.xx + a.y0 * b.xy + b.x0,
            y0: a.x0 * b.yx + a.y0 * b.yy + b.y0,
        }
    }

    /// Append `m`: the result applies `self` and then `m`.
    pub fn then(&self, m: &Matrix) -> Matrix {
        Matrix::compose(self, m)
    }

    /// Prepend a translation, so it acts on coordinates before `self`.
    pub fn translate(&mut self, tx: f64, ty: f64) -> &mut Self {
        *self = Matrix::compose(&Matrix::translation(tx, ty), self);
        self
    }

    /// Prepend a scaling.
    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        *self = Matrix::compose(&Matrix::scaling(sx, sy), self);
        self
    }

    /// Prepend a rotation.
    pub fn rotate(&mut self, a: f64) -> &mut Self {
        *self = Matrix::compose(&Matrix::rotation(a), self);
        self
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    pub fn is_invertible(&self) -> bool {
        let d = self.determinant();
        d.is_finite() && d.abs() > SINGULAR_EPSILON
    }

    /// Inverse transform, or [`RasterError::InvalidMatrix`] when the
    /// determinant is within [`SINGULAR_EPSILON`] of zero.
    pub fn invert(&self) -> Result<Matrix> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() <= SINGULAR_EPSILON {
            return Err(RasterError::InvalidMatrix { determinant: det });
        }
        let d = 1.0 / det;
        let xx = self.yy * d;
        let yy = self.xx * d;
        let yx = -self.yx * d;
        let xy = -self.xy * d;
        Ok(Matrix {
            xx,
            yx,
            xy,
            yy,
            x0: -self.x0 * xx - self.y0 * xy,
            y0: -self.x0 * yx - self.y0 * yy,
        })
    }

    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.xx + y * self.xy + self.x0,
            x * self.yx + y * self.yy + self.y0,
        )
    }

    #[inline]
    pub fn map_point(&self, p: PointD) -> PointD {
        let (x, y) = self.transform_point(p.x, p.y);
        PointD::new(x, y)
    }

    /// Map a displacement, ignoring translation.
    #[inline]
    pub fn transform_vector(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx * self.xx + dy * self.xy, dx * self.yx + dy * self.yy)
    }

    /// Largest factor by which the transform stretches any unit vector.
    ///
    /// Used to turn a device-space tolerance into a user-space one.
    pub fn max_scale(&self) -> f64 {
        let s = self.xx * self.xx + self.yx * self.yx + self.xy * self.xy + self.yy * self.yy;
        let det = self.determinant();
        let disc = (s * s - 4.0 * det * det).max(0.0);
        ((s + disc.sqrt()) * 0.5).sqrt()
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        is_equal_eps(self.xx, 1.0, epsilon)
            && is_equal_eps(self.yx, 0.0, epsilon)
            && is_equal_eps(self.xy, 0.0, epsilon)
            && is_equal_eps(self.yy, 1.0, epsilon)
            && is_equal_eps(self.x0, 0.0, epsilon)
            && is_equal_eps(self.y0, 0.0, epsilon)
    }

    pub fn is_finite(&self) -> bool {
        [self.xx, self.yx, self.xy, self.yy, self.x0, self.y0]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `a * b` applies `a` first, then `b`.
impl Mul for Matrix {
    type Output = Matrix;
    fn mul(self, rhs: Matrix) -> Matrix {
        Matrix::compose(&self, &rhs)
    }
}

impl MulAssign for Matrix {
    fn mul_assign(&mut self, rhs: Matrix) {
        *self = Matrix::compose(self, &rhs);
    }
}

// ============================================================================
// Tests
// ============================================================================
