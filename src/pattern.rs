//! Paint sources and the span generator that samples them.
//!
//! Every non-solid paint carries a matrix from user space into pattern
//! space. At fill time it is combined with the inverse of the user to device
//! transform, so device pixel centers can be mapped straight into pattern
//! space and evaluated there.

use std::sync::Arc;

use crate::basics::PointD;
use crate::color::{Color, PremulColor};
use crate::error::{RasterError, Result};
use crate::gradient::{Extend, LinearGradient, RadialGradient};
use crate::matrix::Matrix;
use crate::pixmap::Pixmap;

// ============================================================================
// Surface pattern
// ============================================================================

/// Texel reconstruction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Bilinear,
}

/// An image used as paint. Texel `(i, j)` covers `[i, i+1) x [j, j+1)` in
/// pattern space.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePattern {
    pub pixmap: Arc<Pixmap>,
    pub extend: Extend,
    pub filter: Filter,
    /// User space to pattern space.
    pub matrix: Matrix,
}

impl SurfacePattern {
    pub fn new(pixmap: Arc<Pixmap>) -> Self {
        Self {
            pixmap,
            extend: Extend::None,
            filter: Filter::default(),
            matrix: Matrix::IDENTITY,
        }
    }

    fn texel(&self, i: i64, j: i64) -> PremulColor {
        let w = self.pixmap.width() as i64;
        let h = self.pixmap.height() as i64;
        match (self.extend.apply_index(i, w), self.extend.apply_index(j, h)) {
            (Some(x), Some(y)) => self
                .pixmap
                .pixel(x as i32, y as i32)
                .map(PremulColor::from)
                .unwrap_or(PremulColor::TRANSPARENT),
            _ => PremulColor::TRANSPARENT,
        }
    }

    /// Premultiplied color at a pattern-space point.
    pub fn color_at(&self, p: PointD) -> PremulColor {
        if !p.is_finite() {
            return PremulColor::TRANSPARENT;
        }
        match self.filter {
            Filter::Nearest => self.texel(p.x.floor() as i64, p.y.floor() as i64),
            Filter::Bilinear => {
                // texel centers sit at half-integers
                let u = p.x - 0.5;
                let v = p.y - 0.5;
                let x0 = u.floor();
                let y0 = v.floor();
                let fx = u - x0;
                let fy = v - y0;
                let (i, j) = (x0 as i64, y0 as i64);

                let mut acc = PremulColor::TRANSPARENT;
                for (di, dj, w) in [
                    (0, 0, (1.0 - fx) * (1.0 - fy)),
                    (1, 0, fx * (1.0 - fy)),
                    (0, 1, (1.0 - fx) * fy),
                    (1, 1, fx * fy),
                ] {
                    if w > 0.0 {
                        acc = acc.add(&self.texel(i + di, j + dj).scale(w));
                    }
                }
                acc.clip()
            }
        }
    }
}

// ============================================================================
// Paint
// ============================================================================

/// What a fill paints with.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear(LinearGradient),
    Radial(RadialGradient),
    Surface(SurfacePattern),
}

impl Paint {
    pub fn solid(r: f64, g: f64, b: f64, a: f64) -> Paint {
        Paint::Solid(Color::new(r, g, b, a))
    }

    /// Reject paints that cannot be sampled.
    pub fn validate(&self) -> Result<()> {
        match self {
            Paint::Solid(c) => {
                if [c.r, c.g, c.b, c.a].iter().all(|v| v.is_finite()) {
                    Ok(())
                } else {
                    Err(RasterError::InvalidPattern("solid color is not finite"))
                }
            }
            Paint::Linear(g) => g.validate(),
            Paint::Radial(g) => g.validate(),
            Paint::Surface(s) => {
                if s.matrix.is_finite() {
                    Ok(())
                } else {
                    Err(RasterError::InvalidPattern("surface matrix is not finite"))
                }
            }
        }
    }

    /// User space to pattern space.
    pub fn matrix(&self) -> Matrix {
        match self {
            Paint::Solid(_) => Matrix::IDENTITY,
            Paint::Linear(g) => g.matrix,
            Paint::Radial(g) => g.matrix,
            Paint::Surface(s) => s.matrix,
        }
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, Paint::Solid(_))
    }

    /// Premultiplied color at a point already in pattern space.
    pub fn color_at(&self, p: PointD) -> PremulColor {
        match self {
            Paint::Solid(c) => c.premultiply(),
            Paint::Linear(g) => g.color_at(p),
            Paint::Radial(g) => g.color_at(p),
            Paint::Surface(s) => s.color_at(p),
        }
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Solid(c)
    }
}

impl From<LinearGradient> for Paint {
    fn from(g: LinearGradient) -> Self {
        Paint::Linear(g)
    }
}

impl From<RadialGradient> for Paint {
    fn from(g: RadialGradient) -> Self {
        Paint::Radial(g)
    }
}

impl From<SurfacePattern> for Paint {
    fn from(s: SurfacePattern) -> Self {
        Paint::Surface(s)
    }
}

/// Sample `paint` at a device point. `to_pattern` maps device space to
/// pattern space, i.e. the inverse transform composed with the paint matrix.
pub fn sample(paint: &Paint, device_x: f64, device_y: f64, to_pattern: &Matrix) -> PremulColor {
    let p = to_pattern.map_point(PointD::new(device_x, device_y));
    paint.color_at(p)
}

// ============================================================================
// Span generation
// ============================================================================

/// Produces the source colors of a horizontal pixel run.
pub trait SpanGenerator {
    /// Fill `span` with the colors of pixels `x .. x + span.len()` on row `y`.
    fn generate(&self, span: &mut [PremulColor], x: i32, y: i32);
}

/// A validated paint bound to a device transform.
#[derive(Debug, Clone)]
pub struct PaintSampler<'a> {
    paint: &'a Paint,
    solid: Option<PremulColor>,
    to_pattern: Matrix,
}

impl<'a> PaintSampler<'a> {
    /// Fails with `InvalidPattern` for unusable paints and with
    /// `InvalidMatrix` when a non-solid paint meets a singular transform.
    pub fn new(paint: &'a Paint, transform: &Matrix) -> Result<Self> {
        paint.validate()?;
        if let Paint::Solid(c) = paint {
            return Ok(Self {
                paint,
                solid: Some(c.premultiply()),
                to_pattern: Matrix::IDENTITY,
            });
        }
        let inverse = transform.invert()?;
        Ok(Self {
            paint,
            solid: None,
            to_pattern: Matrix::compose(&inverse, &paint.matrix()),
        })
    }

    /// Device to pattern space.
    pub fn to_pattern(&self) -> &Matrix {
        &self.to_pattern
    }

    pub fn sample(&self, device_x: f64, device_y: f64) -> PremulColor {
        match self.solid {
            Some(c) => c,
            None => sample(self.paint, device_x, device_y, &self.to_pattern),
        }
    }
}

impl SpanGenerator for PaintSampler<'_> {
    fn generate(&self, span: &mut [PremulColor], x: i32, y: i32) {
        if let Some(c) = self.solid {
            span.fill(c);
            return;
        }
        let m = &self.to_pattern;
        let start = m.map_point(PointD::new(x as f64 + 0.5, y as f64 + 0.5));
        // one pixel to the right in device space
        let (dx, dy) = m.transform_vector(1.0, 0.0);
        for (i, out) in span.iter_mut().enumerate() {
            let k = i as f64;
            *out = self
                .paint
                .color_at(PointD::new(start.x + dx * k, start.y + dy * k));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba8;
    use crate::gradient::ColorStops;

    const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

    fn checker() -> Arc<Pixmap> {
        // 2x2: red, blue / blue, red
        let mut pm = Pixmap::new(2, 2).unwrap();
        let r = Rgba8::new(255, 0, 0, 255);
        let b = Rgba8::new(0, 0, 255, 255);
        {
            let mut m = pm.as_mut();
            r.write_to(&mut m.row_mut(0)[0..4]);
            b.write_to(&mut m.row_mut(0)[4..8]);
            b.write_to(&mut m.row_mut(1)[0..4]);
            r.write_to(&mut m.row_mut(1)[4..8]);
        }
        Arc::new(pm)
    }

    fn close(a: PremulColor, b: PremulColor) -> bool {
        (a.r - b.r).abs() < 1e-9
            && (a.g - b.g).abs() < 1e-9
            && (a.b - b.b).abs() < 1e-9
            && (a.a - b.a).abs() < 1e-9
    }

    #[test]
    fn test_solid_ignores_singular_transform() {
        let paint = Paint::Solid(RED);
        let s = PaintSampler::new(&paint, &Matrix::scaling(0.0, 0.0)).unwrap();
        let mut span = [PremulColor::TRANSPARENT; 3];
        s.generate(&mut span, 0, 0);
        assert!(span.iter().all(|c| *c == RED.premultiply()));
    }

    #[test]
    fn test_gradient_needs_invertible_transform() {
        let mut g = LinearGradient::new(0.0, 0.0, 10.0, 0.0);
        g.stops = ColorStops::new().with(0.0, RED).with(1.0, BLUE);
        let paint = Paint::from(g);
        assert!(matches!(
            PaintSampler::new(&paint, &Matrix::scaling(0.0, 1.0)),
            Err(RasterError::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn test_empty_gradient_rejected() {
        let paint = Paint::from(LinearGradient::new(0.0, 0.0, 1.0, 0.0));
        assert!(matches!(
            PaintSampler::new(&paint, &Matrix::IDENTITY),
            Err(RasterError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_span_matches_pointwise_sample() {
        let mut g = LinearGradient::new(0.0, 0.0, 10.0, 0.0);
        g.stops = ColorStops::new().with(0.0, RED).with(1.0, BLUE);
        g.matrix = Matrix::rotation(0.3);
        let paint = Paint::from(g);
        let ctm = Matrix::new(1.5, 0.2, -0.1, 0.9, 3.0, 4.0);
        let s = PaintSampler::new(&paint, &ctm).unwrap();
        let mut span = [PremulColor::TRANSPARENT; 12];
        s.generate(&mut span, -2, 5);
        for (i, c) in span.iter().enumerate() {
            let expect = s.sample(-2.0 + i as f64 + 0.5, 5.5);
            assert!(close(*c, expect), "pixel {}", i);
        }
    }

    #[test]
    fn test_transform_moves_gradient() {
        let mut g = LinearGradient::new(0.0, 0.0, 10.0, 0.0);
        g.stops = ColorStops::new().with(0.0, RED).with(1.0, BLUE);
        let paint = Paint::from(g);
        // user space is shifted 100 px to the right on the device
        let s = PaintSampler::new(&paint, &Matrix::translation(100.0, 0.0)).unwrap();
        assert!(close(s.sample(100.0, 0.0), RED.premultiply()));
        assert!(close(s.sample(110.0, 0.0), BLUE.premultiply()));
    }

    #[test]
    fn test_nearest_surface() {
        let mut sp = SurfacePattern::new(checker());
        sp.filter = Filter::Nearest;
        assert!(close(sp.color_at(PointD::new(0.5, 0.5)), RED.premultiply()));
        assert!(close(sp.color_at(PointD::new(1.5, 0.5)), BLUE.premultiply()));
        assert!(sp.color_at(PointD::new(2.5, 0.5)).is_transparent());

        sp.extend = Extend::Repeat;
        assert!(close(sp.color_at(PointD::new(2.5, 0.5)), RED.premultiply()));
        sp.extend = Extend::Reflect;
        assert!(close(sp.color_at(PointD::new(2.5, 0.5)), BLUE.premultiply()));
        sp.extend = Extend::Pad;
        assert!(close(sp.color_at(PointD::new(-7.0, 0.5)), RED.premultiply()));
    }

    #[test]
    fn test_bilinear_surface() {
        let mut sp = SurfacePattern::new(checker());
        sp.extend = Extend::Pad;
        // at a texel center the filter returns the texel
        assert!(close(sp.color_at(PointD::new(0.5, 0.5)), RED.premultiply()));
        // halfway between red and blue
        let c = sp.color_at(PointD::new(1.0, 0.5));
        assert!((c.r - 0.5).abs() < 1e-9 && (c.b - 0.5).abs() < 1e-9);
        assert!((c.a - 1.0).abs() < 1e-9);

        // outside with None the missing taps are transparent
        sp.extend = Extend::None;
        let edge = sp.color_at(PointD::new(2.0, 0.5));
        assert!((edge.a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_surface_sampler_scaled() {
        let mut sp = SurfacePattern::new(checker());
        sp.filter = Filter::Nearest;
        let paint = Paint::from(sp);
        // each texel spans 10 device pixels
        let s = PaintSampler::new(&paint, &Matrix::scaling(10.0, 10.0)).unwrap();
        let mut span = [PremulColor::TRANSPARENT; 20];
        s.generate(&mut span, 0, 0);
        assert!(close(span[9], RED.premultiply()));
        assert!(close(span[10], BLUE.premultiply()));
    }
}
