//! Scanline containers.
//!
//! The rasterizer reports one row at a time through the [`Scanline`] trait.
//! [`CoverageScanline`] keeps per-pixel coverage runs for rendering;
//! [`CoverageProbe`] watches a single pixel.

use crate::basics::CoverType;

/// Receiver for the coverage of one pixel row. X must increase monotonically.
pub trait Scanline {
    /// Forget all spans before a new row.
    fn reset_spans(&mut self);

    /// One pixel at `x` with its own coverage.
    fn add_cell(&mut self, x: i32, cover: CoverType);

    /// `len` pixels starting at `x`, all with the same coverage.
    fn add_span(&mut self, x: i32, len: u32, cover: CoverType);

    /// The row is complete.
    fn finalize(&mut self, y: i32);

    fn num_spans(&self) -> usize;

    fn y(&self) -> i32;
}

/// A horizontal run of covered pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSpan {
    pub x: i32,
    pub len: i32,
    /// Index of the first coverage value in [`CoverageScanline::covers`].
    pub cover_offset: usize,
}

/// Row of coverage spans with one coverage byte per pixel.
#[derive(Debug, Clone, Default)]
pub struct CoverageScanline {
    last_x: Option<i32>,
    y: i32,
    covers: Vec<CoverType>,
    spans: Vec<CoverageSpan>,
}

impl CoverageScanline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> &[CoverageSpan] {
        &self.spans
    }

    pub fn covers(&self) -> &[CoverType] {
        &self.covers
    }

    /// Coverage values of one span.
    pub fn span_covers(&self, span: &CoverageSpan) -> &[CoverType] {
        &self.covers[span.cover_offset..span.cover_offset + span.len as usize]
    }

    fn extend_or_start(&mut self, x: i32, len: i32) {
        let prev = self.last_x;
        self.last_x = Some(x + len - 1);
        if let (Some(last), Some(span)) = (prev, self.spans.last_mut()) {
            if x == last + 1 {
                span.len += len;
                return;
            }
        }
        let cover_offset = self.covers.len();
        self.spans.push(CoverageSpan {
            x,
            len,
            cover_offset,
        });
    }
}

impl Scanline for CoverageScanline {
    fn reset_spans(&mut self) {
        self.last_x = None;
        self.covers.clear();
        self.spans.clear();
    }

    fn add_cell(&mut self, x: i32, cover: CoverType) {
        self.extend_or_start(x, 1);
        self.covers.push(cover);
    }

    fn add_span(&mut self, x: i32, len: u32, cover: CoverType) {
        if len == 0 {
            return;
        }
        self.extend_or_start(x, len as i32);
        self.covers.resize(self.covers.len() + len as usize, cover);
    }

    fn finalize(&mut self, y: i32) {
        self.y = y;
    }

    fn num_spans(&self) -> usize {
        self.spans.len()
    }

    fn y(&self) -> i32 {
        self.y
    }
}

/// Records the coverage reported for a single pixel column.
#[derive(Debug, Clone, Copy)]
pub struct CoverageProbe {
    x: i32,
    cover: CoverType,
    spans: usize,
    y: i32,
}

impl CoverageProbe {
    pub fn new(x: i32) -> Self {
        Self {
            x,
            cover: 0,
            spans: 0,
            y: 0,
        }
    }

    pub fn cover(&self) -> CoverType {
        self.cover
    }

    pub fn hit(&self) -> bool {
        self.cover != 0
    }
}

impl Scanline for CoverageProbe {
    fn reset_spans(&mut self) {
        self.cover = 0;
        self.spans = 0;
    }

    fn add_cell(&mut self, x: i32, cover: CoverType) {
        self.spans += 1;
        if x == self.x {
            self.cover = cover;
        }
    }

    fn add_span(&mut self, x: i32, len: u32, cover: CoverType) {
        self.spans += 1;
        if self.x >= x && (self.x as i64) < x as i64 + len as i64 {
            self.cover = cover;
        }
    }

    fn finalize(&mut self, y: i32) {
        self.y = y;
    }

    fn num_spans(&self) -> usize {
        self.spans
    }

    fn y(&self) -> i32 {
        self.y
    }
}
