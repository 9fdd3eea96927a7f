//! Anti-aliased scanline rasterizer.
//!
//! Accepts device-space edges, clips them to a box, accumulates exact-area
//! cells on a 256×256 subpixel grid and sweeps them row by row into
//! [`Scanline`] receivers. Coverage is quantised to 8 bits; a pixel fully
//! inside the shape always reports [`COVER_FULL`].
//!
//! Clipping keeps the winding number intact: parts of an edge left or
//! right of the box are replaced by vertical segments on the box border.

use crate::basics::{
    cover_to_unit, poly_coord, CoverType, FillRule, RectD, RectI, COVER_FULL, POLY_MAX_COORD,
    POLY_SUBPIXEL_SHIFT,
};
use crate::cells::CellStorage;
use crate::edge::{Edge, EdgeList};
use crate::error::Result;
use crate::scanline::{CoverageProbe, Scanline};

const AA_SHIFT: u32 = 8;
const AA_SCALE: i64 = 1 << AA_SHIFT;
const AA_MASK: i64 = AA_SCALE - 1;
const AA_SCALE2: i64 = AA_SCALE * 2;
const AA_MASK2: i64 = AA_SCALE2 - 1;

/// Coverage quantisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialias {
    /// Fractional coverage from exact pixel areas.
    #[default]
    Gray,
    /// Coverage snapped to 0 or full at 50%.
    None,
}

/// Converts edges into per-row coverage.
#[derive(Debug)]
pub struct Rasterizer {
    cells: CellStorage,
    clip_box: RectD,
    fill_rule: FillRule,
    antialias: Antialias,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            cells: CellStorage::new(),
            clip_box: Self::max_box(),
            fill_rule: FillRule::NonZero,
            antialias: Antialias::Gray,
        }
    }

    fn max_box() -> RectD {
        let m = POLY_MAX_COORD / 2.0;
        RectD::new(-m, -m, m, m)
    }

    /// Discard all accumulated coverage.
    pub fn reset(&mut self) {
        self.cells.reset();
    }

    pub fn set_fill_rule(&mut self, rule: FillRule) {
        self.fill_rule = rule;
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn set_antialias(&mut self, aa: Antialias) {
        self.antialias = aa;
    }

    /// Restrict coverage to the pixels of `r`. Resets the rasterizer.
    pub fn set_clip_box(&mut self, r: RectI) {
        self.reset();
        let mut b = RectD::new(r.x1 as f64, r.y1 as f64, r.x2 as f64, r.y2 as f64);
        b.normalize();
        b.clip(&Self::max_box());
        self.clip_box = b;
    }

    /// Remove the clip box. Resets the rasterizer.
    pub fn reset_clipping(&mut self) {
        self.reset();
        self.clip_box = Self::max_box();
    }

    // ========================================================================
    // Edge input
    // ========================================================================

    pub fn add_edge(&mut self, e: &Edge) {
        self.line_d(e.x0, e.y0, e.x1, e.y1);
    }

    pub fn add_edges(&mut self, edges: &EdgeList) {
        for e in edges.edges() {
            self.add_edge(e);
        }
    }

    /// Add a directed line in device coordinates, clipped to the clip box.
    pub fn line_d(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return;
        }
        let b = self.clip_box;
        let f1 = clipping_flags(x1, y1, &b);
        let f2 = clipping_flags(x2, y2, &b);

        // both ends above or both below the box
        if (f1 & 10) == (f2 & 10) && (f1 & 10) != 0 {
            return;
        }

        let y_at = |x: f64| y1 + (x - x1) * (y2 - y1) / (x2 - x1);
        match ((f1 & 5) << 1) | (f2 & 5) {
            0 => self.line_clip_y(x1, y1, x2, y2, f1, f2),
            1 => {
                // x2 > clip.x2
                let y3 = y_at(b.x2);
                let f3 = clipping_flags_y(y3, &b);
                self.line_clip_y(x1, y1, b.x2, y3, f1, f3);
                self.line_clip_y(b.x2, y3, b.x2, y2, f3, f2);
            }
            2 => {
                // x1 > clip.x2
                let y3 = y_at(b.x2);
                let f3 = clipping_flags_y(y3, &b);
                self.line_clip_y(b.x2, y1, b.x2, y3, f1, f3);
                self.line_clip_y(b.x2, y3, x2, y2, f3, f2);
            }
            3 => self.line_clip_y(b.x2, y1, b.x2, y2, f1, f2),
            4 => {
                // x2 < clip.x1
                let y3 = y_at(b.x1);
                let f3 = clipping_flags_y(y3, &b);
                self.line_clip_y(x1, y1, b.x1, y3, f1, f3);
                self.line_clip_y(b.x1, y3, b.x1, y2, f3, f2);
            }
            6 => {
                // x1 > clip.x2, x2 < clip.x1
                let y3 = y_at(b.x2);
                let y4 = y_at(b.x1);
                let f3 = clipping_flags_y(y3, &b);
                let f4 = clipping_flags_y(y4, &b);
                self.line_clip_y(b.x2, y1, b.x2, y3, f1, f3);
                self.line_clip_y(b.x2, y3, b.x1, y4, f3, f4);
                self.line_clip_y(b.x1, y4, b.x1, y2, f4, f2);
            }
            8 => {
                // x1 < clip.x1
                let y3 = y_at(b.x1);
                let f3 = clipping_flags_y(y3, &b);
                self.line_clip_y(b.x1, y1, b.x1, y3, f1, f3);
                self.line_clip_y(b.x1, y3, x2, y2, f3, f2);
            }
            9 => {
                // x1 < clip.x1, x2 > clip.x2
                let y3 = y_at(b.x1);
                let y4 = y_at(b.x2);
                let f3 = clipping_flags_y(y3, &b);
                let f4 = clipping_flags_y(y4, &b);
                self.line_clip_y(b.x1, y1, b.x1, y3, f1, f3);
                self.line_clip_y(b.x1, y3, b.x2, y4, f3, f4);
                self.line_clip_y(b.x2, y4, b.x2, y2, f4, f2);
            }
            12 => self.line_clip_y(b.x1, y1, b.x1, y2, f1, f2),
            _ => {}
        }
    }

    fn line_clip_y(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, f1: u32, f2: u32) {
        let f1 = f1 & 10;
        let f2 = f2 & 10;
        if (f1 | f2) == 0 {
            self.emit(x1, y1, x2, y2);
            return;
        }
        if f1 == f2 {
            return;
        }
        let b = self.clip_box;
        let x_at = |y: f64| x1 + (y - y1) * (x2 - x1) / (y2 - y1);
        let (mut tx1, mut ty1, mut tx2, mut ty2) = (x1, y1, x2, y2);
        if f1 & 8 != 0 {
            tx1 = x_at(b.y1);
            ty1 = b.y1;
        }
        if f1 & 2 != 0 {
            tx1 = x_at(b.y2);
            ty1 = b.y2;
        }
        if f2 & 8 != 0 {
            tx2 = x_at(b.y1);
            ty2 = b.y1;
        }
        if f2 & 2 != 0 {
            tx2 = x_at(b.y2);
            ty2 = b.y2;
        }
        self.emit(tx1, ty1, tx2, ty2);
    }

    #[inline]
    fn emit(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.cells
            .line(poly_coord(x1), poly_coord(y1), poly_coord(x2), poly_coord(y2));
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Index accumulated cells for row access. Must run before sweeping.
    pub fn sort(&mut self) -> Result<()> {
        self.cells.sort_cells()
    }

    /// Pixel bounds of the produced coverage, half-open.
    pub fn bounds(&self) -> Option<RectI> {
        if self.cells.total_cells() == 0 {
            return None;
        }
        Some(RectI::new(
            self.cells.min_x(),
            self.cells.min_y(),
            self.cells.max_x() + 1,
            self.cells.max_y() + 1,
        ))
    }

    /// Map accumulated area (in subpixel² × 2 units) to a coverage byte
    /// according to the fill rule.
    #[inline]
    pub fn calculate_alpha(&self, area: i64) -> CoverType {
        let mut cover = (area >> (POLY_SUBPIXEL_SHIFT * 2 + 1 - AA_SHIFT)).saturating_abs();
        if self.fill_rule == FillRule::EvenOdd {
            cover &= AA_MASK2;
            if cover > AA_SCALE {
                cover = AA_SCALE2 - cover;
            }
        }
        cover = cover.min(AA_MASK);
        match self.antialias {
            Antialias::Gray => cover as CoverType,
            Antialias::None if cover > AA_MASK / 2 => COVER_FULL,
            Antialias::None => 0,
        }
    }

    /// Report the coverage of row `y` to `sl`. Returns `true` when the row has spans.
    ///
    /// Read-only, so several workers can sweep disjoint rows at once.
    pub fn sweep_row<S: Scanline>(&self, y: i32, sl: &mut S) -> bool {
        sl.reset_spans();
        let mut cells = self.cells.row(y).peekable();
        // sums of many stacked cells exceed i32
        let mut cover: i64 = 0;

        while let Some(cell) = cells.next() {
            let x = cell.x;
            let mut area = cell.area as i64;
            cover += cell.cover as i64;

            // merge cells sharing a column
            while let Some(next) = cells.peek() {
                if next.x != x {
                    break;
                }
                area += next.area as i64;
                cover += next.cover as i64;
                cells.next();
            }

            let mut span_x = x;
            if area != 0 {
                let alpha = self.calculate_alpha((cover << (POLY_SUBPIXEL_SHIFT + 1)) - area);
                if alpha != 0 {
                    sl.add_cell(x, alpha);
                }
                span_x = x + 1;
            }

            if let Some(next) = cells.peek() {
                if next.x > span_x {
                    let alpha = self.calculate_alpha(cover << (POLY_SUBPIXEL_SHIFT + 1));
                    if alpha != 0 {
                        sl.add_span(span_x, (next.x - span_x) as u32, alpha);
                    }
                }
            }
        }

        sl.finalize(y);
        sl.num_spans() > 0
    }

    /// Coverage of pixel `(x, y)` in `[0, 1]`. Requires [`sort`](Self::sort).
    pub fn coverage_at(&self, x: i32, y: i32) -> f64 {
        let mut probe = CoverageProbe::new(x);
        self.sweep_row(y, &mut probe);
        cover_to_unit(probe.cover())
    }

    /// Whether pixel `(x, y)` has any coverage. Requires [`sort`](Self::sort).
    pub fn hit_test(&self, x: i32, y: i32) -> bool {
        let mut probe = CoverageProbe::new(x);
        self.sweep_row(y, &mut probe);
        probe.hit()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcode of a point against a box:
/// `1` right of x2, `2` below y2, `4` left of x1, `8` above y1.
#[inline]
fn clipping_flags(x: f64, y: f64, b: &RectD) -> u32 {
    (x > b.x2) as u32 | ((y > b.y2) as u32) << 1 | ((x < b.x1) as u32) << 2 | ((y < b.y1) as u32) << 3
}

#[inline]
fn clipping_flags_y(y: f64, b: &RectD) -> u32 {
    ((y > b.y2) as u32) << 1 | ((y < b.y1) as u32) << 3
}

// ============================================================================
// Tests
// ============================================================================
