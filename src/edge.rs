//! Device-space edges.
//!
//! Every flattened subpath is closed for filling and split into directed
//! segments. Horizontal segments never change the winding number and are
//! dropped here, as are segments with non-finite coordinates.

use log::warn;

use crate::basics::{PointD, RectD};
use crate::error::{RasterError, Result};
use crate::flatten::Polyline;

/// A directed line segment. Its winding contribution follows from the
/// endpoint order: `+1` when it runs toward increasing y, `-1` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Edge {
    /// `None` for horizontal or non-finite segments.
    pub fn new(p0: PointD, p1: PointD) -> Option<Edge> {
        if !p0.is_finite() || !p1.is_finite() || p0.y == p1.y {
            return None;
        }
        Some(Edge {
            x0: p0.x,
            y0: p0.y,
            x1: p1.x,
            y1: p1.y,
        })
    }

    pub fn min_y(&self) -> f64 {
        self.y0.min(self.y1)
    }

    pub fn max_y(&self) -> f64 {
        self.y0.max(self.y1)
    }
}

/// Reusable, contiguous edge storage for one fill.
#[derive(Debug, Clone, Default)]
pub struct EdgeList {
    edges: Vec<Edge>,
    bounds: Option<RectD>,
    rejected: usize,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.bounds = None;
        self.rejected = 0;
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Bounding box of the kept edges.
    pub fn bounds(&self) -> Option<RectD> {
        self.bounds
    }

    /// Segments dropped because of non-finite coordinates.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Add a polyline as a closed ring: the last point connects back to the first.
    pub fn add_closed(&mut self, points: &[PointD]) -> Result<()> {
        if points.len() < 2 {
            return Ok(());
        }
        self.edges
            .try_reserve(points.len())
            .map_err(RasterError::oom("edge list"))?;
        for w in points.windows(2) {
            self.push(w[0], w[1]);
        }
        let first = points[0];
        let last = points[points.len() - 1];
        if first != last {
            self.push(last, first);
        }
        Ok(())
    }

    /// Add every polyline; open ones are closed implicitly.
    pub fn add_polylines(&mut self, lines: &[Polyline]) -> Result<()> {
        let before = self.rejected;
        for line in lines {
            self.add_closed(&line.points)?;
        }
        if self.rejected > before {
            warn!("dropped {} edge(s) with non-finite coordinates", self.rejected - before);
        }
        Ok(())
    }

    fn push(&mut self, p0: PointD, p1: PointD) {
        if !p0.is_finite() || !p1.is_finite() {
            self.rejected += 1;
            return;
        }
        if let Some(e) = Edge::new(p0, p1) {
            let b = self.bounds.get_or_insert(RectD::new(e.x0, e.y0, e.x0, e.y0));
            b.x1 = b.x1.min(e.x0).min(e.x1);
            b.x2 = b.x2.max(e.x0).max(e.x1);
            b.y1 = b.y1.min(e.y0).min(e.y1);
            b.y2 = b.y2.max(e.y0).max(e.y1);
            self.edges.push(e);
        }
    }

    /// Net winding of a horizontal ray from `(x, y)` to the right.
    #[cfg(test)]
    pub(crate) fn winding_at(&self, x: f64, y: f64) -> i32 {
        self.edges
            .iter()
            .filter(|e| y >= e.min_y() && y < e.max_y())
            .filter(|e| {
                let t = (y - e.y0) / (e.y1 - e.y0);
                e.x0 + t * (e.x1 - e.x0) > x
            })
            .map(|e| if e.y1 > e.y0 { 1 } else { -1 })
            .sum()
    }
}
