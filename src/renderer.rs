//! Fill and stroke drivers.
//!
//! Ties the pipeline together: flatten the path in device space, collect
//! edges, rasterize into cells, then sweep rows and composite the paint
//! through the coverage of each span. Rows are split into horizontal bands
//! that render independently; with the `parallel` feature the bands run on
//! the rayon pool.

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::basics::{FillRule, RectI};
use crate::color::PremulColor;
use crate::compositor::{composite_span, Operator};
use crate::edge::EdgeList;
use crate::error::{RasterError, Result};
use crate::flatten::{Flattener, Polyline, DEFAULT_TOLERANCE};
use crate::matrix::Matrix;
use crate::path::Path;
use crate::pattern::{Paint, PaintSampler, SpanGenerator};
use crate::pixmap::{PixmapMut, BYTES_PER_PIXEL};
use crate::rasterizer::{Antialias, Rasterizer};
use crate::scanline::CoverageScanline;
use crate::stroke::{stroke_as_fill, StrokeStyle};

// ============================================================================
// FillOptions
// ============================================================================

/// Quality and scheduling knobs for a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOptions {
    /// Maximum curve flattening error in device pixels.
    pub tolerance: f64,
    pub antialias: Antialias,
    /// Device-space clip. Must lie inside the destination.
    pub clip: Option<RectI>,
    /// Number of row bands. `0` picks one per worker thread.
    pub bands: usize,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            antialias: Antialias::Gray,
            clip: None,
            bands: 0,
        }
    }
}

impl FillOptions {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_antialias(mut self, antialias: Antialias) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn with_clip(mut self, clip: RectI) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_bands(mut self, bands: usize) -> Self {
        self.bands = bands;
        self
    }

    fn band_count(&self) -> usize {
        if self.bands > 0 {
            return self.bands;
        }
        #[cfg(feature = "parallel")]
        {
            rayon::current_num_threads().max(1)
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }
}

// ============================================================================
// Renderer
// ============================================================================

/// Reusable fill state. Scratch buffers survive between calls, and the
/// rasterizer keeps the coverage of the last fill for probing.
#[derive(Debug, Default)]
pub struct Renderer {
    options: FillOptions,
    polylines: Vec<Polyline>,
    edges: EdgeList,
    rasterizer: Rasterizer,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FillOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FillOptions) {
        self.options = options;
    }

    /// Coverage of the most recent fill.
    pub fn rasterizer(&self) -> &Rasterizer {
        &self.rasterizer
    }

    /// Fill `path` with `paint` into `dest`.
    ///
    /// The path is in user space and `transform` maps it to device pixels.
    /// Pixels outside the shape, or outside the clip, are left untouched.
    pub fn fill(
        &mut self,
        path: &Path,
        paint: &Paint,
        fill_rule: FillRule,
        transform: &Matrix,
        op: Operator,
        dest: &mut PixmapMut<'_>,
    ) -> Result<()> {
        let sampler = PaintSampler::new(paint, transform)?;

        let bounds = dest.bounds();
        let clip = match self.options.clip {
            Some(mut c) => {
                c.normalize();
                if !bounds.contains(&c) {
                    return Err(RasterError::BufferMismatch(format!(
                        "clip {:?} exceeds the {}x{} destination",
                        c,
                        dest.width(),
                        dest.height()
                    )));
                }
                c
            }
            None => bounds,
        };

        self.rasterizer.set_fill_rule(fill_rule);
        self.rasterizer.set_antialias(self.options.antialias);
        // also drops the previous coverage
        self.rasterizer.set_clip_box(clip);
        if clip.is_empty() {
            return Ok(());
        }

        self.polylines.clear();
        Flattener::new(self.options.tolerance).flatten_path_into(path, transform, &mut self.polylines);
        self.edges.clear();
        self.edges.add_polylines(&self.polylines)?;
        self.rasterizer.add_edges(&self.edges);
        self.rasterizer.sort()?;

        let covered = match self.rasterizer.bounds().and_then(|mut b| b.clip(&clip).then_some(b)) {
            Some(b) => b,
            None => {
                debug!("fill: {} edge(s), nothing to paint", self.edges.len());
                return Ok(());
            }
        };

        let rows = covered.height() as usize;
        let bands = self.options.band_count().clamp(1, rows);
        let band_rows = (rows + bands - 1) / bands;
        debug!(
            "fill: {} edge(s), {} band(s) of {} row(s), covering {:?}",
            self.edges.len(),
            bands,
            band_rows,
            covered
        );

        let stride = dest.stride();
        let row_bytes = dest.width() as usize * BYTES_PER_PIXEL;
        let first = covered.y1 as usize;
        let start = first * stride;
        let end = (covered.y2 as usize - 1) * stride + row_bytes;
        let region = &mut dest.bytes_mut()[start..end];

        let band = Band {
            rasterizer: &self.rasterizer,
            generator: &sampler,
            op,
            clip: covered,
            stride,
        };
        let chunk = band_rows * stride;

        #[cfg(feature = "parallel")]
        {
            if bands > 1 {
                region
                    .par_chunks_mut(chunk)
                    .enumerate()
                    .for_each(|(i, rows)| band.render(rows, covered.y1 + (i * band_rows) as i32));
                return Ok(());
            }
        }

        for (i, rows) in region.chunks_mut(chunk).enumerate() {
            band.render(rows, covered.y1 + (i * band_rows) as i32);
        }
        Ok(())
    }

    /// Stroke `path` with `style`, then fill the outline with the nonzero rule.
    pub fn stroke(
        &mut self,
        path: &Path,
        style: &StrokeStyle,
        paint: &Paint,
        transform: &Matrix,
        op: Operator,
        dest: &mut PixmapMut<'_>,
    ) -> Result<()> {
        let outline = stroke_as_fill(path, style, transform);
        self.fill(&outline, paint, FillRule::NonZero, transform, op, dest)
    }
}

/// Read-only state shared by all bands of one fill.
struct Band<'a, G> {
    rasterizer: &'a Rasterizer,
    generator: &'a G,
    op: Operator,
    clip: RectI,
    stride: usize,
}

impl<G: SpanGenerator> Band<'_, G> {
    /// Render the rows stored in `bytes`, the first of which is row `y0`.
    fn render(&self, bytes: &mut [u8], y0: i32) {
        let mut sl = CoverageScanline::new();
        let mut colors: Vec<PremulColor> = Vec::new();

        for (i, y) in (y0..self.clip.y2).enumerate() {
            let row_start = i * self.stride;
            if row_start >= bytes.len() {
                break;
            }
            if !self.rasterizer.sweep_row(y, &mut sl) {
                continue;
            }
            for span in sl.spans() {
                let x0 = span.x.max(self.clip.x1);
                let x1 = (span.x + span.len).min(self.clip.x2);
                if x0 >= x1 {
                    continue;
                }
                let len = (x1 - x0) as usize;
                let skip = (x0 - span.x) as usize;
                let covers = &sl.span_covers(span)[skip..skip + len];

                colors.clear();
                colors.resize(len, PremulColor::TRANSPARENT);
                self.generator.generate(&mut colors, x0, y);

                let px = row_start + x0 as usize * BYTES_PER_PIXEL;
                composite_span(self.op, &mut bytes[px..px + len * BYTES_PER_PIXEL], &colors, covers);
            }
        }
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Fill `path` into `dest` with default options.
pub fn fill(
    path: &Path,
    paint: &Paint,
    fill_rule: FillRule,
    transform: &Matrix,
    op: Operator,
    dest: &mut PixmapMut<'_>,
) -> Result<()> {
    Renderer::new().fill(path, paint, fill_rule, transform, op, dest)
}

/// Fill `path` into `dest` with explicit options.
pub fn fill_with_options(
    path: &Path,
    paint: &Paint,
    fill_rule: FillRule,
    transform: &Matrix,
    op: Operator,
    dest: &mut PixmapMut<'_>,
    options: &FillOptions,
) -> Result<()> {
    Renderer::with_options(options.clone()).fill(path, paint, fill_rule, transform, op, dest)
}

/// Stroke `path` into `dest` with default options.
pub fn stroke(
    path: &Path,
    style: &StrokeStyle,
    paint: &Paint,
    transform: &Matrix,
    op: Operator,
    dest: &mut PixmapMut<'_>,
) -> Result<()> {
    Renderer::new().stroke(path, style, paint, transform, op, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Rgba8};
    use crate::pixmap::Pixmap;

    fn square(x: f64, y: f64, w: f64, h: f64) -> Path {
        let mut p = Path::new();
        p.rectangle(x, y, w, h);
        p
    }

    fn red() -> Paint {
        Paint::Solid(Color::new(1.0, 0.0, 0.0, 1.0))
    }

    #[test]
    fn test_fill_square() {
        let mut pm = Pixmap::new(20, 20).unwrap();
        let mut r = Renderer::new();
        r.fill(
            &square(5.0, 5.0, 10.0, 10.0),
            &red(),
            FillRule::NonZero,
            &Matrix::IDENTITY,
            Operator::Over,
            &mut pm.as_mut(),
        )
        .unwrap();
        assert_eq!(pm.pixel(5, 5), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(14, 14), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(15, 15), Some(Rgba8::TRANSPARENT));
        assert_eq!(pm.pixel(4, 10), Some(Rgba8::TRANSPARENT));
        assert_eq!(r.rasterizer().coverage_at(10, 10), 1.0);
    }

    #[test]
    fn test_clip_must_fit_destination() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        let mut r = Renderer::with_options(FillOptions::default().with_clip(RectI::new(0, 0, 11, 5)));
        let err = r
            .fill(
                &square(0.0, 0.0, 5.0, 5.0),
                &red(),
                FillRule::NonZero,
                &Matrix::IDENTITY,
                Operator::Over,
                &mut pm.as_mut(),
            )
            .unwrap_err();
        assert!(matches!(err, RasterError::BufferMismatch(_)));
    }

    #[test]
    fn test_clip_limits_painting() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        let mut r = Renderer::with_options(FillOptions::default().with_clip(RectI::new(2, 2, 4, 4)));
        r.fill(
            &square(0.0, 0.0, 10.0, 10.0),
            &red(),
            FillRule::NonZero,
            &Matrix::IDENTITY,
            Operator::Source,
            &mut pm.as_mut(),
        )
        .unwrap();
        assert_eq!(pm.pixel(2, 2), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(3, 3), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(4, 3), Some(Rgba8::TRANSPARENT));
        assert_eq!(pm.pixel(1, 2), Some(Rgba8::TRANSPARENT));
    }

    #[test]
    fn test_shape_outside_destination() {
        let mut pm = Pixmap::new(10, 10).unwrap();
        fill(
            &square(-50.0, -50.0, 10.0, 10.0),
            &red(),
            FillRule::NonZero,
            &Matrix::IDENTITY,
            Operator::Over,
            &mut pm.as_mut(),
        )
        .unwrap();
        assert!(pm.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bands_match_sequential() {
        let mut path = Path::new();
        path.ellipse(16.0, 16.0, 13.0, 9.0);
        let paint = red();
        let mut one = Pixmap::new(32, 32).unwrap();
        let mut many = Pixmap::new(32, 32).unwrap();
        fill_with_options(
            &path,
            &paint,
            FillRule::NonZero,
            &Matrix::IDENTITY,
            Operator::Over,
            &mut one.as_mut(),
            &FillOptions::default().with_bands(1),
        )
        .unwrap();
        fill_with_options(
            &path,
            &paint,
            FillRule::NonZero,
            &Matrix::IDENTITY,
            Operator::Over,
            &mut many.as_mut(),
            &FillOptions::default().with_bands(5),
        )
        .unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn test_padded_rows() {
        // stride 48 for 10 pixels, last row without padding
        let mut bytes = vec![9u8; 48 * 3 + 40];
        {
            let mut pm = PixmapMut::from_bytes(&mut bytes, 10, 4, 48).unwrap();
            fill(
                &square(0.0, 0.0, 10.0, 4.0),
                &red(),
                FillRule::NonZero,
                &Matrix::IDENTITY,
                Operator::Source,
                &mut pm,
            )
            .unwrap();
        }
        assert_eq!(&bytes[0..4], &[255, 0, 0, 255]);
        assert_eq!(&bytes[40..48], &[9; 8]);
        assert_eq!(&bytes[48 * 3 + 36..48 * 3 + 40], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_stroke_method() {
        let mut pm = Pixmap::new(20, 20).unwrap();
        let mut path = Path::new();
        path.move_to(2.0, 10.0).line_to(18.0, 10.0);
        Renderer::new()
            .stroke(
                &path,
                &StrokeStyle::new(2.0),
                &red(),
                &Matrix::IDENTITY,
                Operator::Over,
                &mut pm.as_mut(),
            )
            .unwrap();
        assert_eq!(pm.pixel(10, 9), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(10, 10), Some(Rgba8::new(255, 0, 0, 255)));
        assert_eq!(pm.pixel(10, 11), Some(Rgba8::TRANSPARENT));
    }
}
