//! Color stops, extend modes and gradient parameter functions.
//!
//! A gradient maps a point in pattern space to a parameter `t`; the stop
//! list maps `t` to a color. Colors between two stops are interpolated in
//! straight (non-premultiplied) space and premultiplied afterwards.

use crate::basics::PointD;
use crate::color::{Color, PremulColor};
use crate::error::{RasterError, Result};
use crate::matrix::Matrix;

/// Below this the linear gradient axis or the radial quadratic term is
/// treated as zero.
const DEGENERATE_EPSILON: f64 = 1e-12;

// ============================================================================
// Extend
// ============================================================================

/// What a pattern shows outside its natural domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extend {
    /// Transparent outside.
    None,
    /// Clamp to the edge.
    Pad,
    /// Tile.
    Repeat,
    /// Tile, mirroring every other copy.
    Reflect,
}

impl Extend {
    /// Map a gradient parameter into `[0, 1]`, or `None` where nothing is painted.
    pub fn apply(self, t: f64) -> Option<f64> {
        if !t.is_finite() {
            return None;
        }
        match self {
            Extend::None => (0.0..=1.0).contains(&t).then_some(t),
            Extend::Pad => Some(t.clamp(0.0, 1.0)),
            Extend::Repeat => Some(t - t.floor()),
            Extend::Reflect => {
                let m = t.rem_euclid(2.0);
                Some(if m > 1.0 { 2.0 - m } else { m })
            }
        }
    }

    /// Map an integer texel index into `[0, size)`.
    pub fn apply_index(self, i: i64, size: i64) -> Option<i64> {
        if size <= 0 {
            return None;
        }
        match self {
            Extend::None => (0..size).contains(&i).then_some(i),
            Extend::Pad => Some(i.clamp(0, size - 1)),
            Extend::Repeat => Some(i.rem_euclid(size)),
            Extend::Reflect => {
                let m = i.rem_euclid(size * 2);
                Some(if m >= size { size * 2 - 1 - m } else { m })
            }
        }
    }
}

// ============================================================================
// Color stops
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

/// Stops kept sorted by offset. Stops with equal offsets keep insertion
/// order, which gives hard transitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorStops {
    stops: Vec<ColorStop>,
}

impl ColorStops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stop; the offset is clamped into `[0, 1]`.
    pub fn add(&mut self, offset: f64, color: Color) {
        let offset = if offset.is_nan() {
            0.0
        } else {
            offset.clamp(0.0, 1.0)
        };
        let idx = self.stops.partition_point(|s| s.offset <= offset);
        self.stops.insert(idx, ColorStop { offset, color });
    }

    pub fn with(mut self, offset: f64, color: Color) -> Self {
        self.add(offset, color);
        self
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn as_slice(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Straight color at `t` in `[0, 1]`.
    ///
    /// At or before the first offset this is the first stop, at or after
    /// the last offset the last stop. Inside, the segment starts at the
    /// last stop whose offset is `<= t`.
    pub fn color_at(&self, t: f64) -> Color {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Color::TRANSPARENT,
        };
        if t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }
        let i = self.stops.partition_point(|s| s.offset <= t) - 1;
        let s0 = &self.stops[i];
        let s1 = &self.stops[i + 1];
        let k = (t - s0.offset) / (s1.offset - s0.offset);
        s0.color.lerp(&s1.color, k)
    }

    pub fn premul_at(&self, t: f64) -> PremulColor {
        self.color_at(t).premultiply()
    }

    /// Mean color over `[0, 1]`, integrating the piecewise linear ramp.
    pub fn average(&self) -> Color {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Color::TRANSPARENT,
        };
        let mut acc = [0.0f64; 4];
        let mut add = |c: &Color, w: f64| {
            acc[0] += c.r * w;
            acc[1] += c.g * w;
            acc[2] += c.b * w;
            acc[3] += c.a * w;
        };
        add(&first.color, first.offset);
        for w in self.stops.windows(2) {
            let span = w[1].offset - w[0].offset;
            add(&w[0].color.lerp(&w[1].color, 0.5), span);
        }
        add(&last.color, 1.0 - last.offset);
        Color::new(acc[0], acc[1], acc[2], acc[3])
    }
}

// ============================================================================
// Linear gradient
// ============================================================================

/// Gradient along the axis `p0 -> p1`; `t` is the projection onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub p0: PointD,
    pub p1: PointD,
    pub stops: ColorStops,
    pub extend: Extend,
    /// User space to pattern space.
    pub matrix: Matrix,
}

impl LinearGradient {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            p0: PointD::new(x0, y0),
            p1: PointD::new(x1, y1),
            stops: ColorStops::new(),
            extend: Extend::Pad,
            matrix: Matrix::IDENTITY,
        }
    }

    pub fn add_stop(&mut self, offset: f64, color: Color) -> &mut Self {
        self.stops.add(offset, color);
        self
    }

    pub fn is_degenerate(&self) -> bool {
        let d = self.p1 - self.p0;
        d.x * d.x + d.y * d.y <= DEGENERATE_EPSILON
    }

    pub fn validate(&self) -> Result<()> {
        if self.stops.is_empty() {
            return Err(RasterError::InvalidPattern("gradient has no color stops"));
        }
        if !self.p0.is_finite() || !self.p1.is_finite() {
            return Err(RasterError::InvalidPattern("gradient geometry is not finite"));
        }
        Ok(())
    }

    /// Gradient parameter of a pattern-space point. `None` when the axis has
    /// no length.
    pub fn parameter(&self, p: PointD) -> Option<f64> {
        if self.is_degenerate() {
            return None;
        }
        let d = self.p1 - self.p0;
        let v = p - self.p0;
        Some((v.x * d.x + v.y * d.y) / (d.x * d.x + d.y * d.y))
    }

    /// Premultiplied color at a pattern-space point.
    pub fn color_at(&self, p: PointD) -> PremulColor {
        match self.parameter(p) {
            Some(t) => match self.extend.apply(t) {
                Some(t) => self.stops.premul_at(t),
                None => PremulColor::TRANSPARENT,
            },
            // zero-length axis: nothing for None, the limit color otherwise
            None => match self.extend {
                Extend::None => PremulColor::TRANSPARENT,
                Extend::Pad => self.stops.premul_at(1.0),
                Extend::Repeat | Extend::Reflect => self.stops.average().premultiply(),
            },
        }
    }
}

// ============================================================================
// Radial gradient
// ============================================================================

/// Two-circle gradient: `t` is the largest value for which the point lies
/// on the circle interpolated between `(c0, r0)` and `(c1, r1)` with a
/// non-negative radius.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub c0: PointD,
    pub r0: f64,
    pub c1: PointD,
    pub r1: f64,
    pub stops: ColorStops,
    pub extend: Extend,
    /// User space to pattern space.
    pub matrix: Matrix,
}

impl RadialGradient {
    pub fn new(cx0: f64, cy0: f64, r0: f64, cx1: f64, cy1: f64, r1: f64) -> Self {
        Self {
            c0: PointD::new(cx0, cy0),
            r0,
            c1: PointD::new(cx1, cy1),
            r1,
            stops: ColorStops::new(),
            extend: Extend::Pad,
            matrix: Matrix::IDENTITY,
        }
    }

    pub fn add_stop(&mut self, offset: f64, color: Color) -> &mut Self {
        self.stops.add(offset, color);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.stops.is_empty() {
            return Err(RasterError::InvalidPattern("gradient has no color stops"));
        }
        if !self.c0.is_finite()
            || !self.c1.is_finite()
            || !self.r0.is_finite()
            || !self.r1.is_finite()
        {
            return Err(RasterError::InvalidPattern("gradient geometry is not finite"));
        }
        if self.r0 < 0.0 || self.r1 < 0.0 {
            return Err(RasterError::InvalidPattern("negative gradient radius"));
        }
        if self.r0 == 0.0 && self.r1 == 0.0 && self.c0 == self.c1 {
            return Err(RasterError::InvalidPattern("radial gradient has zero extent"));
        }
        Ok(())
    }

    /// Solve `a t^2 - 2 b t + c = 0` for the point `p`, where
    /// `a = |cd|^2 - dr^2`, `b = pd.cd + r0 dr`, `c = |pd|^2 - r0^2`.
    ///
    /// Roots are tried from the larger down; a root is usable when the
    /// interpolated radius is non-negative and, for [`Extend::None`], when
    /// it lies in `[0, 1]`.
    pub fn parameter(&self, p: PointD) -> Option<f64> {
        let cd = self.c1 - self.c0;
        let pd = p - self.c0;
        let dr = self.r1 - self.r0;

        let a = cd.x * cd.x + cd.y * cd.y - dr * dr;
        let b = pd.x * cd.x + pd.y * cd.y + self.r0 * dr;
        let c = pd.x * pd.x + pd.y * pd.y - self.r0 * self.r0;

        let usable = |t: f64| {
            t.is_finite()
                && self.r0 + t * dr >= 0.0
                && (self.extend != Extend::None || (0.0..=1.0).contains(&t))
        };

        if a.abs() <= DEGENERATE_EPSILON {
            if b == 0.0 {
                return None;
            }
            let t = c / (2.0 * b);
            return usable(t).then_some(t);
        }

        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let t0 = (b + sq) / a;
        let t1 = (b - sq) / a;
        let (hi, lo) = if t0 >= t1 { (t0, t1) } else { (t1, t0) };
        if usable(hi) {
            Some(hi)
        } else if usable(lo) {
            Some(lo)
        } else {
            None
        }
    }

    /// Premultiplied color at a pattern-space point.
    pub fn color_at(&self, p: PointD) -> PremulColor {
        match self.parameter(p).and_then(|t| self.extend.apply(t)) {
            Some(t) => self.stops.premul_at(t),
            None => PremulColor::TRANSPARENT,
        }
    }
}
