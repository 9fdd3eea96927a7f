//! Path geometry.
//!
//! A [`Path`] is an ordered list of subpaths. Every subpath begins with a
//! `MoveTo` and may end with a `ClosePath`. Quadratic curves and circular
//! arcs are stored as cubic Bézier segments.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::basics::{PointD, RectD};
use crate::matrix::Matrix;

/// Arcs are split into pieces of at most a quarter turn; pieces shorter than
/// this are folded into the previous one.
const ARC_ANGLE_EPSILON: f64 = 0.01;

/// One path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(PointD),
    LineTo(PointD),
    /// Cubic Bézier with two control points and an end point.
    CurveTo(PointD, PointD, PointD),
    ClosePath,
}

/// A vector path in user space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    segments: Vec<PathSegment>,
    start: Option<PointD>,
    current: Option<PointD>,
    closed: bool,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current_point(&self) -> Option<PointD> {
        self.current
    }

    /// Iterate over subpaths in order.
    pub fn subpaths(&self) -> Subpaths<'_> {
        Subpaths {
            rest: &self.segments,
        }
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Begin a new subpath at `(x, y)`.
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        let p = PointD::new(x, y);
        // a lone MoveTo is an empty subpath; replace it
        if let Some(PathSegment::MoveTo(last)) = self.segments.last_mut() {
            *last = p;
        } else {
            self.segments.push(PathSegment::MoveTo(p));
        }
        self.start = Some(p);
        self.current = Some(p);
        self.closed = false;
        self
    }

    /// Straight line to `(x, y)`. Without a current point this acts as `move_to`.
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        if self.current.is_none() {
            return self.move_to(x, y);
        }
        self.reopen();
        let p = PointD::new(x, y);
        self.segments.push(PathSegment::LineTo(p));
        self.current = Some(p);
        self
    }

    /// Cubic Bézier through control points `(x1, y1)` and `(x2, y2)` to `(x3, y3)`.
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        if self.current.is_none() {
            self.move_to(x1, y1);
        }
        self.reopen();
        let p3 = PointD::new(x3, y3);
        self.segments.push(PathSegment::CurveTo(
            PointD::new(x1, y1),
            PointD::new(x2, y2),
            p3,
        ));
        self.current = Some(p3);
        self
    }

    /// Quadratic Bézier, stored as the equivalent cubic.
    pub fn quad_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> &mut Self {
        let p0 = match self.current {
            Some(p) => p,
            None => {
                self.move_to(x1, y1);
                PointD::new(x1, y1)
            }
        };
        let c = PointD::new(x1, y1);
        let p2 = PointD::new(x2, y2);
        let c1 = p0 + (c - p0) * (2.0 / 3.0);
        let c2 = p2 + (c - p2) * (2.0 / 3.0);
        self.curve_to(c1.x, c1.y, c2.x, c2.y, x2, y2)
    }

    /// Close the current subpath back to its starting point.
    pub fn close_path(&mut self) -> &mut Self {
        if self.current.is_none() || self.closed {
            return self;
        }
        self.segments.push(PathSegment::ClosePath);
        self.current = self.start;
        self.closed = true;
        self
    }

    /// Relative variants use the current point as origin, or `(0, 0)` without one.
    pub fn rel_move_to(&mut self, dx: f64, dy: f64) -> &mut Self {
        let o = self.current.unwrap_or_default();
        self.move_to(o.x + dx, o.y + dy)
    }

    pub fn rel_line_to(&mut self, dx: f64, dy: f64) -> &mut Self {
        let o = self.current.unwrap_or_default();
        self.line_to(o.x + dx, o.y + dy)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rel_curve_to(
        &mut self,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        dx3: f64,
        dy3: f64,
    ) -> &mut Self {
        let o = self.current.unwrap_or_default();
        self.curve_to(o.x + dx1, o.y + dy1, o.x + dx2, o.y + dy2, o.x + dx3, o.y + dy3)
    }

    /// Circular arc of radius `r` around `(xc, yc)` from angle `a1` to `a2`
    /// in the direction of increasing angle.
    ///
    /// A line joins the current point to the arc start.
    pub fn arc(&mut self, xc: f64, yc: f64, r: f64, a1: f64, a2: f64) -> &mut Self {
        let mut a2 = a2;
        if a2 < a1 {
            let turns = ((a1 - a2) / (2.0 * PI)).ceil();
            a2 += turns * 2.0 * PI;
        }
        self.arc_sweep(xc, yc, r, r, a1, a2 - a1)
    }

    /// Like [`arc`](Self::arc) but in the direction of decreasing angle.
    pub fn arc_negative(&mut self, xc: f64, yc: f64, r: f64, a1: f64, a2: f64) -> &mut Self {
        let mut a2 = a2;
        if a2 > a1 {
            let turns = ((a2 - a1) / (2.0 * PI)).ceil();
            a2 -= turns * 2.0 * PI;
        }
        self.arc_sweep(xc, yc, r, r, a1, a2 - a1)
    }

    /// Closed axis-aligned rectangle.
    pub fn rectangle(&mut self, x: f64, y: f64, w: f64, h: f64) -> &mut Self {
        self.move_to(x, y)
            .line_to(x + w, y)
            .line_to(x + w, y + h)
            .line_to(x, y + h)
            .close_path()
    }

    /// Closed ellipse made of four cubic quadrants.
    pub fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> &mut Self {
        self.move_to(cx + rx, cy);
        self.arc_sweep(cx, cy, rx, ry, 0.0, 2.0 * PI);
        self.close_path()
    }

    fn arc_sweep(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, start: f64, sweep: f64) -> &mut Self {
        let (sx, sy) = (cx + rx * start.cos(), cy + ry * start.sin());
        match self.current {
            Some(c) if !self.closed => {
                if c != PointD::new(sx, sy) {
                    self.line_to(sx, sy);
                }
            }
            _ => {
                self.move_to(sx, sy);
            }
        }
        if sweep.abs() < 1e-10 || rx == 0.0 && ry == 0.0 {
            return self;
        }

        let mut angle = start;
        let mut swept = 0.0;
        loop {
            let step = if sweep < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
            let mut local = step;
            let done = (sweep - swept).abs() <= FRAC_PI_2 + ARC_ANGLE_EPSILON;
            if done {
                local = sweep - swept;
            }
            let [_, c1, c2, p] = arc_to_bezier(cx, cy, rx, ry, angle, local);
            self.curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y);
            angle += local;
            swept += local;
            if done {
                break;
            }
        }
        self
    }

    fn reopen(&mut self) {
        if self.closed {
            if let Some(s) = self.start {
                self.segments.push(PathSegment::MoveTo(s));
            }
            self.closed = false;
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Copy of the path with every point mapped through `m`.
    pub fn transformed(&self, m: &Matrix) -> Path {
        let map = |p: &PointD| m.map_point(*p);
        Path {
            segments: self
                .segments
                .iter()
                .map(|s| match s {
                    PathSegment::MoveTo(p) => PathSegment::MoveTo(map(p)),
                    PathSegment::LineTo(p) => PathSegment::LineTo(map(p)),
                    PathSegment::CurveTo(a, b, c) => PathSegment::CurveTo(map(a), map(b), map(c)),
                    PathSegment::ClosePath => PathSegment::ClosePath,
                })
                .collect(),
            start: self.start.as_ref().map(map),
            current: self.current.as_ref().map(map),
            closed: self.closed,
        }
    }

    /// Bounds of all points, control points included.
    pub fn bounding_box(&self) -> Option<RectD> {
        let mut points = self.segments.iter().flat_map(|s| match s {
            PathSegment::MoveTo(p) | PathSegment::LineTo(p) => vec![*p],
            PathSegment::CurveTo(a, b, c) => vec![*a, *b, *c],
            PathSegment::ClosePath => Vec::new(),
        });
        let first = points.next()?;
        let mut r = RectD::new(first.x, first.y, first.x, first.y);
        for p in points {
            r.x1 = r.x1.min(p.x);
            r.y1 = r.y1.min(p.y);
            r.x2 = r.x2.max(p.x);
            r.y2 = r.y2.max(p.y);
        }
        Some(r)
    }
}

/// Control points `[p0, c1, c2, p3]` of a cubic approximating the elliptical
/// arc starting at `start` and spanning `sweep` radians (at most a quarter turn).
pub fn arc_to_bezier(cx: f64, cy: f64, rx: f64, ry: f64, start: f64, sweep: f64) -> [PointD; 4] {
    let x0 = (sweep / 2.0).cos();
    let y0 = (sweep / 2.0).sin();
    let tx = (1.0 - x0) * 4.0 / 3.0;
    let ty = y0 - tx * x0 / y0;

    let px = [x0, x0 + tx, x0 + tx, x0];
    let py = [-y0, -ty, ty, y0];

    let (sn, cs) = (start + sweep / 2.0).sin_cos();
    let mut out = [PointD::default(); 4];
    for i in 0..4 {
        out[i] = PointD::new(
            cx + rx * (px[i] * cs - py[i] * sn),
            cy + ry * (px[i] * sn + py[i] * cs),
        );
    }
    out
}

// ============================================================================
// Subpath iteration
// ============================================================================

/// A borrowed run of segments starting with `MoveTo`.
#[derive(Debug, Clone, Copy)]
pub struct Subpath<'a> {
    segments: &'a [PathSegment],
}

impl<'a> Subpath<'a> {
    pub fn segments(&self) -> &'a [PathSegment] {
        self.segments
    }

    pub fn start(&self) -> PointD {
        match self.segments.first() {
            Some(PathSegment::MoveTo(p)) => *p,
            _ => PointD::default(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.segments.last(), Some(PathSegment::ClosePath))
    }
}

pub struct Subpaths<'a> {
    rest: &'a [PathSegment],
}

impl<'a> Iterator for Subpaths<'a> {
    type Item = Subpath<'a>;

    fn next(&mut self) -> Option<Subpath<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest[1..]
            .iter()
            .position(|s| matches!(s, PathSegment::MoveTo(_)))
            .map_or(self.rest.len(), |i| i + 1);
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(Subpath { segments: head })
    }
}

// ============================================================================
// Tests
// ============================================================================
