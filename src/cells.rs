//! Exact-area coverage cells.
//!
//! Edges in 24.8 fixed point are decomposed into per-pixel cells. Each cell
//! stores `cover`, the signed height the edges travel inside the pixel,
//! and `area`, twice the signed area between those edge fragments and
//! the pixel's left border. Summing `cover` left to right along a row
//! gives the winding number in subpixel units, and `area` gives the
//! partial coverage of the boundary pixel itself.

use crate::basics::{POLY_SUBPIXEL_MASK, POLY_SUBPIXEL_SCALE, POLY_SUBPIXEL_SHIFT};
use crate::error::{RasterError, Result};

/// Accumulated coverage of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub cover: i32,
    pub area: i32,
}

impl Cell {
    const fn empty() -> Self {
        Self {
            x: i32::MAX,
            y: i32::MAX,
            cover: 0,
            area: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RowIndex {
    start: u32,
    num: u32,
}

/// Longest horizontal run handled without splitting the line first.
const DX_LIMIT: i64 = 16384 << POLY_SUBPIXEL_SHIFT;

/// Cells grow in chunks of this many entries.
const CELL_BLOCK: usize = 4096;

/// A pending cell is pushed and restarted once `cover` or `area` passes this
/// magnitude. Rows merge cells of one column when swept, so the split is
/// invisible in the coverage.
const CELL_SPLIT_LIMIT: u32 = 1 << 30;

/// Converts fixed-point lines into cells and sorts them by row and column.
#[derive(Debug, Default)]
pub struct CellStorage {
    cells: Vec<Cell>,
    sorted: Vec<u32>,
    rows: Vec<RowIndex>,
    curr: Cell,
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    is_sorted: bool,
    alloc_failed: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl CellStorage {
    pub fn new() -> Self {
        Self {
            min_x: i32::MAX,
            min_y: i32::MAX,
            max_x: i32::MIN,
            max_y: i32::MIN,
            ..Default::default()
        }
    }

    /// Drop all cells, keeping allocations for reuse.
    pub fn reset(&mut self) {
        self.cells.clear();
        self.sorted.clear();
        self.rows.clear();
        self.curr = Cell::empty();
        self.min_x = i32::MAX;
        self.min_y = i32::MAX;
        self.max_x = i32::MIN;
        self.max_y = i32::MIN;
        self.is_sorted = false;
        self.alloc_failed = false;
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }
    pub fn min_y(&self) -> i32 {
        self.min_y
    }
    pub fn max_x(&self) -> i32 {
        self.max_x
    }
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }

    /// Cells of row `y`, ordered by `x`. Empty before sorting or outside the bounds.
    pub fn row(&self, y: i32) -> impl Iterator<Item = &Cell> + '_ {
        let idx: &[u32] = if self.is_sorted && y >= self.min_y && y <= self.max_y {
            let r = self.rows[(y - self.min_y) as usize];
            &self.sorted[r.start as usize..(r.start + r.num) as usize]
        } else {
            &[]
        };
        idx.iter().map(move |&i| &self.cells[i as usize])
    }

    // ========================================================================
    // Accumulation
    // ========================================================================

    #[inline]
    fn flush_curr(&mut self) {
        if self.curr.area | self.curr.cover == 0 {
            return;
        }
        if self.cells.len() == self.cells.capacity()
            && self.cells.try_reserve(CELL_BLOCK.max(self.cells.len())).is_err()
        {
            self.alloc_failed = true;
            return;
        }
        self.cells.push(self.curr);
    }

    #[inline]
    fn set_curr(&mut self, x: i32, y: i32) {
        if self.curr.x != x || self.curr.y != y {
            self.flush_curr();
            self.curr = Cell {
                x,
                y,
                cover: 0,
                area: 0,
            };
        }
    }

    #[inline]
    fn accumulate(&mut self, cover: i32, area: i32) {
        if self.curr.area.unsigned_abs() > CELL_SPLIT_LIMIT
            || self.curr.cover.unsigned_abs() > CELL_SPLIT_LIMIT
        {
            let (x, y) = (self.curr.x, self.curr.y);
            self.flush_curr();
            self.curr = Cell {
                x,
                y,
                cover: 0,
                area: 0,
            };
        }
        self.curr.cover += cover;
        self.curr.area += area;
    }

    #[inline]
    fn extend_bounds(&mut self, ex: i32, ey: i32) {
        self.min_x = self.min_x.min(ex);
        self.max_x = self.max_x.max(ex);
        self.min_y = self.min_y.min(ey);
        self.max_y = self.max_y.max(ey);
    }

    /// Walk a line fragment inside row `ey`. `y1`/`y2` are subpixel offsets
    /// within the row, `x1`/`x2` full fixed-point coordinates.
    fn render_hline(&mut self, ey: i32, x1: i32, y1: i32, x2: i32, y2: i32) {
        let scale = POLY_SUBPIXEL_SCALE as i32;
        let ex1 = x1 >> POLY_SUBPIXEL_SHIFT;
        let ex2 = x2 >> POLY_SUBPIXEL_SHIFT;
        let fx1 = x1 & POLY_SUBPIXEL_MASK as i32;
        let fx2 = x2 & POLY_SUBPIXEL_MASK as i32;

        // horizontal: only the position changes
        if y1 == y2 {
            self.set_curr(ex2, ey);
            return;
        }

        if ex1 == ex2 {
            let delta = y2 - y1;
            self.accumulate(delta, (fx1 + fx2) * delta);
            return;
        }

        // The fragment crosses several cells of the row
        let mut p = (scale as i64 - fx1 as i64) * (y2 - y1) as i64;
        let mut first = scale;
        let mut incr = 1;
        let mut dx = x2 as i64 - x1 as i64;
        if dx < 0 {
            p = fx1 as i64 * (y2 - y1) as i64;
            first = 0;
            incr = -1;
            dx = -dx;
        }

        let (mut delta, mut modulo) = floor_div_mod(p, dx);
        self.accumulate(delta, (fx1 + first) * delta);

        let mut ex = ex1 + incr;
        self.set_curr(ex, ey);
        let mut y = y1 + delta;

        if ex != ex2 {
            let (lift, rem) = floor_div_mod(scale as i64 * (y2 - y + delta) as i64, dx);
            modulo -= dx;
            while ex != ex2 {
                delta = lift;
                modulo += rem;
                if modulo >= 0 {
                    modulo -= dx;
                    delta += 1;
                }
                self.accumulate(delta, scale * delta);
                y += delta;
                ex += incr;
                self.set_curr(ex, ey);
            }
        }
        delta = y2 - y;
        self.accumulate(delta, (fx2 + scale - first) * delta);
    }

    /// Add a directed line in 24.8 fixed point.
    pub fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let dx = x2 as i64 - x1 as i64;
        if dx >= DX_LIMIT || dx <= -DX_LIMIT {
            let cx = ((x1 as i64 + x2 as i64) >> 1) as i32;
            let cy = ((y1 as i64 + y2 as i64) >> 1) as i32;
            self.line(x1, y1, cx, cy);
            self.line(cx, cy, x2, y2);
            return;
        }

        let scale = POLY_SUBPIXEL_SCALE as i32;
        let dy = y2 as i64 - y1 as i64;
        let ex1 = x1 >> POLY_SUBPIXEL_SHIFT;
        let ex2 = x2 >> POLY_SUBPIXEL_SHIFT;
        let mut ey1 = y1 >> POLY_SUBPIXEL_SHIFT;
        let ey2 = y2 >> POLY_SUBPIXEL_SHIFT;
        let fy1 = y1 & POLY_SUBPIXEL_MASK as i32;
        let fy2 = y2 & POLY_SUBPIXEL_MASK as i32;

        self.extend_bounds(ex1, ey1);
        self.extend_bounds(ex2, ey2);
        self.is_sorted = false;

        self.set_curr(ex1, ey1);

        if ey1 == ey2 {
            self.render_hline(ey1, x1, fy1, x2, fy2);
            return;
        }

        let mut incr = 1;

        // Vertical line: one cell per row, no hline walking
        if dx == 0 {
            let ex = ex1;
            let two_fx = (x1 - (ex << POLY_SUBPIXEL_SHIFT)) << 1;
            let mut first = scale;
            if dy < 0 {
                first = 0;
                incr = -1;
            }

            let mut delta = first - fy1;
            self.accumulate(delta, two_fx * delta);

            ey1 += incr;
            self.set_curr(ex, ey1);

            delta = first + first - scale;
            let area = two_fx * delta;
            while ey1 != ey2 {
                self.curr.cover = delta;
                self.curr.area = area;
                ey1 += incr;
                self.set_curr(ex, ey1);
            }
            delta = fy2 - scale + first;
            self.accumulate(delta, two_fx * delta);
            return;
        }

        // General case: one hline per crossed row
        let mut p = (scale as i64 - fy1 as i64) * dx;
        let mut first = scale;
        let mut dy_abs = dy;
        if dy < 0 {
            p = fy1 as i64 * dx;
            first = 0;
            incr = -1;
            dy_abs = -dy;
        }

        let (delta, mut modulo) = floor_div_mod(p, dy_abs);
        let mut x_from = x1 + delta;
        self.render_hline(ey1, x1, fy1, x_from, first);

        ey1 += incr;
        self.set_curr(x_from >> POLY_SUBPIXEL_SHIFT, ey1);

        if ey1 != ey2 {
            let (lift, rem) = floor_div_mod(scale as i64 * dx, dy_abs);
            modulo -= dy_abs;
            while ey1 != ey2 {
                let mut delta = lift;
                modulo += rem;
                if modulo >= 0 {
                    modulo -= dy_abs;
                    delta += 1;
                }
                let x_to = x_from + delta;
                self.render_hline(ey1, x_from, scale - first, x_to, first);
                x_from = x_to;

                ey1 += incr;
                self.set_curr(x_from >> POLY_SUBPIXEL_SHIFT, ey1);
            }
        }
        self.render_hline(ey1, x_from, scale - first, x2, fy2);
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    /// Flush the pending cell and index all cells by row, then by column.
    pub fn sort_cells(&mut self) -> Result<()> {
        if self.is_sorted {
            return Ok(());
        }
        self.flush_curr();
        self.curr = Cell::empty();
        if self.alloc_failed {
            return Err(RasterError::OutOfMemory("coverage cells"));
        }
        if self.cells.is_empty() {
            return Ok(());
        }

        let num_cells = self.cells.len();
        self.sorted.clear();
        self.sorted
            .try_reserve(num_cells)
            .map_err(RasterError::oom("sorted cell index"))?;
        self.sorted.resize(num_cells, 0);

        let num_rows = (self.max_y as i64 - self.min_y as i64 + 1) as usize;
        self.rows.clear();
        self.rows
            .try_reserve(num_rows)
            .map_err(RasterError::oom("row index"))?;
        self.rows.resize(num_rows, RowIndex::default());

        // Histogram of cells per row
        for cell in &self.cells {
            self.rows[(cell.y - self.min_y) as usize].start += 1;
        }
        let mut start = 0u32;
        for row in &mut self.rows {
            let count = row.start;
            row.start = start;
            start += count;
        }

        for (i, cell) in self.cells.iter().enumerate() {
            let row = &mut self.rows[(cell.y - self.min_y) as usize];
            self.sorted[(row.start + row.num) as usize] = i as u32;
            row.num += 1;
        }

        let cells = &self.cells;
        for row in &self.rows {
            if row.num > 1 {
                let slice = &mut self.sorted[row.start as usize..(row.start + row.num) as usize];
                slice.sort_unstable_by_key(|&i| cells[i as usize].x);
            }
        }

        self.is_sorted = true;
        Ok(())
    }
}

/// Floor division with a non-negative remainder.
#[inline]
fn floor_div_mod(p: i64, d: i64) -> (i32, i64) {
    let mut q = p / d;
    let mut r = p % d;
    if r < 0 {
        q -= 1;
        r += d;
    }
    (q as i32, r)
}
