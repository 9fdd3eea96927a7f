//! Stroking: turns the outline of a stroked path into a fillable path.
//!
//! Each subpath is flattened in user space and offset by half the line
//! width on both sides. Open subpaths become one ring (left side forward,
//! end cap, right side backward, start cap). Closed subpaths become two
//! rings of opposite orientation, so the result must be filled with the
//! nonzero rule. Inner corners are routed through the vertex itself, which
//! leaves small overlapping loops that nonzero filling absorbs.

use std::f64::consts::PI;

use crate::basics::PointD;
use crate::flatten::{Flattener, Polyline, DEFAULT_TOLERANCE, MIN_TOLERANCE};
use crate::matrix::Matrix;
use crate::path::Path;

/// Upper bound on the points emitted for one round join or cap.
const MAX_ARC_STEPS: usize = 4096;

/// Line cap style for path endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Line join style at path corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke parameters. Lengths are in user space; `tolerance` is in device
/// pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: f64,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Miters longer than `miter_limit * width / 2` are beveled.
    pub miter_limit: f64,
    /// Alternating on/off lengths. Empty for a solid line.
    pub dash: Vec<f64>,
    pub dash_offset: f64,
    pub tolerance: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 10.0,
            dash: Vec::new(),
            dash_offset: 0.0,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl StrokeStyle {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    pub fn with_cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    pub fn with_miter_limit(mut self, limit: f64) -> Self {
        self.miter_limit = limit;
        self
    }

    pub fn with_dash(mut self, dash: &[f64], offset: f64) -> Self {
        self.dash = dash.to_vec();
        self.dash_offset = offset;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// The dash pattern to use, or `None` for a solid line. Patterns with
    /// negative or non-finite entries, or with zero total length, are
    /// ignored. Odd-length patterns are repeated once so on and off
    /// alternate.
    fn dash_pattern(&self) -> Option<Vec<f64>> {
        if self.dash.is_empty() || self.dash.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return None;
        }
        let total: f64 = self.dash.iter().sum();
        if total <= 0.0 || !self.dash_offset.is_finite() {
            return None;
        }
        let mut dash = self.dash.clone();
        if dash.len() % 2 == 1 {
            dash.extend_from_slice(&self.dash);
        }
        Some(dash)
    }
}

/// Outline of `path` stroked with `style`, in user space.
///
/// `transform` maps user space to device space; it only sets the user-space
/// flattening tolerance so that the outline, once transformed, stays within
/// `style.tolerance` device pixels. Fill the result with the nonzero rule
/// under the same transform.
pub fn stroke_as_fill(path: &Path, style: &StrokeStyle, transform: &Matrix) -> Path {
    let mut out = Path::new();
    if !(style.width.is_finite() && style.width > 0.0) {
        return out;
    }

    let scale = transform.max_scale();
    let device_tol = if style.tolerance.is_nan() {
        DEFAULT_TOLERANCE
    } else {
        style.tolerance.max(MIN_TOLERANCE)
    };
    let tolerance = if scale.is_finite() && scale > 0.0 {
        (device_tol / scale).max(f64::MIN_POSITIVE)
    } else {
        device_tol
    };

    let mut flattener = Flattener::new(tolerance);
    let lines = flattener.flatten_path(path, &Matrix::IDENTITY);

    let stroker = Stroker {
        hw: style.width * 0.5,
        cap: style.cap,
        join: style.join,
        miter_limit: style.miter_limit.max(1.0),
        tolerance: flattener.tolerance(),
    };

    let dash = style.dash_pattern();
    for line in &lines {
        let run = Run::from_polyline(line);
        match &dash {
            Some(dash) => {
                for piece in dash_run(&run, dash, style.dash_offset) {
                    stroker.stroke_run(&piece, &mut out);
                }
            }
            None => stroker.stroke_run(&run, &mut out),
        }
    }
    out
}

// ============================================================================
// Runs
// ============================================================================

/// A polyline without repeated points, ready for offsetting.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    points: Vec<PointD>,
    closed: bool,
    /// Whether the run came from drawing segments, as opposed to a lone
    /// move. Degenerate drawn runs still get dot caps.
    drawn: bool,
    /// Direction used for square dots when the run has no extent.
    dir: PointD,
}

impl Run {
    fn from_polyline(line: &Polyline) -> Run {
        let mut points: Vec<PointD> = Vec::with_capacity(line.points.len());
        for &p in &line.points {
            if !p.is_finite() {
                continue;
            }
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        if line.closed && points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let dir = points
            .windows(2)
            .next()
            .map(|w| unit(w[1] - w[0]))
            .unwrap_or(PointD::new(1.0, 0.0));
        Run {
            points,
            closed: line.closed,
            drawn: line.points.len() > 1 || line.closed,
            dir,
        }
    }
}

fn unit(v: PointD) -> PointD {
    let len = (v.x * v.x + v.y * v.y).sqrt();
    if len > 0.0 {
        PointD::new(v.x / len, v.y / len)
    } else {
        PointD::new(1.0, 0.0)
    }
}

/// Left-hand normal of a unit direction, scaled by `hw`.
fn normal(d: PointD, hw: f64) -> PointD {
    PointD::new(-d.y * hw, d.x * hw)
}

fn cross(a: PointD, b: PointD) -> f64 {
    a.x * b.y - a.y * b.x
}

fn dot(a: PointD, b: PointD) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Split a run into its "on" dashes.
fn dash_run(run: &Run, dash: &[f64], offset: f64) -> Vec<Run> {
    let n = run.points.len();
    if n < 2 {
        return vec![run.clone()];
    }
    let total: f64 = dash.iter().sum();

    // find the dash entry the offset lands in
    let mut idx = 0;
    let mut remaining = dash[0];
    let mut skip = offset.rem_euclid(total);
    while skip > 0.0 {
        if skip < remaining {
            remaining -= skip;
            break;
        }
        skip -= remaining;
        idx = (idx + 1) % dash.len();
        remaining = dash[idx];
    }
    let start_on = idx % 2 == 0;
    let mut on = start_on;

    let seg_count = if run.closed { n } else { n - 1 };
    let mut pieces: Vec<Run> = Vec::new();
    let mut cur: Vec<PointD> = Vec::new();
    let mut cur_dir = run.dir;
    let mut toggled = false;
    if on {
        cur.push(run.points[0]);
    }

    for i in 0..seg_count {
        let a = run.points[i];
        let b = run.points[(i + 1) % n];
        let seg = b - a;
        let len = (seg.x * seg.x + seg.y * seg.y).sqrt();
        let dir = unit(seg);
        if cur.len() == 1 {
            cur_dir = dir;
        }
        let mut pos = 0.0;
        while len - pos > remaining {
            pos += remaining;
            let q = a + seg * (pos / len);
            if on {
                cur.push(q);
                pieces.push(Run {
                    points: std::mem::take(&mut cur),
                    closed: false,
                    drawn: true,
                    dir: cur_dir,
                });
            } else {
                cur.clear();
                cur.push(q);
                cur_dir = dir;
            }
            on = !on;
            toggled = true;
            idx = (idx + 1) % dash.len();
            remaining = dash[idx];
        }
        remaining -= len - pos;
        if on {
            cur.push(b);
        }
    }

    if !toggled {
        // the pattern never switched: either all on or all off
        return if start_on { vec![run.clone()] } else { Vec::new() };
    }
    if on && cur.len() > 1 {
        pieces.push(Run {
            points: cur,
            closed: false,
            drawn: true,
            dir: cur_dir,
        });
        // a closed run that starts and ends inside a dash joins the two halves
        if run.closed && start_on && pieces.len() > 1 {
            let last = pieces.pop();
            if let Some(mut last) = last {
                let first = pieces.remove(0);
                last.points.extend(first.points.into_iter().skip(1));
                pieces.insert(0, last);
            }
        }
    }

    for p in &mut pieces {
        p.points.dedup();
    }
    pieces
}

// ============================================================================
// Stroker
// ============================================================================

struct Stroker {
    hw: f64,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f64,
    tolerance: f64,
}

impl Stroker {
    fn stroke_run(&self, run: &Run, out: &mut Path) {
        match run.points.len() {
            0 => {}
            1 => {
                if run.drawn {
                    self.dot(run.points[0], run.dir, out);
                }
            }
            _ if run.closed => {
                let reversed: Vec<PointD> = run.points.iter().rev().copied().collect();
                let mut ring = Vec::new();
                self.offset_closed(&run.points, &mut ring);
                emit_ring(&ring, out);
                ring.clear();
                self.offset_closed(&reversed, &mut ring);
                emit_ring(&ring, out);
            }
            _ => {
                let pts = &run.points;
                let n = pts.len();
                let reversed: Vec<PointD> = pts.iter().rev().copied().collect();
                let mut ring = Vec::new();
                self.offset_open(pts, &mut ring);
                self.cap_at(pts[n - 1], unit(pts[n - 1] - pts[n - 2]), &mut ring);
                self.offset_open(&reversed, &mut ring);
                self.cap_at(pts[0], unit(pts[0] - pts[1]), &mut ring);
                emit_ring(&ring, out);
            }
        }
    }

    /// Left offset of an open polyline with joins at the interior vertices.
    fn offset_open(&self, v: &[PointD], out: &mut Vec<PointD>) {
        let n = v.len();
        let d0 = unit(v[1] - v[0]);
        out.push(v[0] + normal(d0, self.hw));
        for i in 1..n - 1 {
            self.join_at(v[i - 1], v[i], v[i + 1], out);
        }
        let dl = unit(v[n - 1] - v[n - 2]);
        out.push(v[n - 1] + normal(dl, self.hw));
    }

    /// Left offset of a closed polyline with a join at every vertex.
    fn offset_closed(&self, v: &[PointD], out: &mut Vec<PointD>) {
        let n = v.len();
        for i in 0..n {
            self.join_at(v[(i + n - 1) % n], v[i], v[(i + 1) % n], out);
        }
    }

    fn join_at(&self, p0: PointD, p1: PointD, p2: PointD, out: &mut Vec<PointD>) {
        let d1 = unit(p1 - p0);
        let d2 = unit(p2 - p1);
        let n1 = normal(d1, self.hw);
        let n2 = normal(d2, self.hw);
        let cp = cross(d1, d2);
        let dp = dot(d1, d2);

        if cp == 0.0 && dp > 0.0 {
            out.push(p1 + n1);
            return;
        }
        if cp > 0.0 {
            // inner side of the turn
            out.push(p1 + n1);
            out.push(p1);
            out.push(p1 + n2);
            return;
        }

        out.push(p1 + n1);
        match self.join {
            LineJoin::Bevel => {}
            LineJoin::Miter => {
                // 1 / cos(turn / 2), the miter length over half the width
                let ratio_sq = 2.0 / (1.0 + dp);
                if dp > -1.0 && ratio_sq <= self.miter_limit * self.miter_limit {
                    let k = 1.0 / (1.0 + dp);
                    out.push(p1 + (n1 + n2) * k);
                }
            }
            LineJoin::Round => {
                let sweep = if cp == 0.0 { -PI } else { cp.atan2(dp) };
                self.arc(p1, n1, sweep, out);
            }
        }
        out.push(p1 + n2);
    }

    /// Cap at `p`, where the line arrives travelling along `d`. Emits the
    /// points strictly between the left and right offsets.
    fn cap_at(&self, p: PointD, d: PointD, out: &mut Vec<PointD>) {
        let n = normal(d, self.hw);
        match self.cap {
            LineCap::Butt => {}
            LineCap::Square => {
                let ext = d * self.hw;
                out.push(p + n + ext);
                out.push(p - n + ext);
            }
            LineCap::Round => self.arc(p, n, -PI, out),
        }
    }

    /// Interior points of the arc around `c` starting at offset `from` and
    /// turning by `sweep` radians.
    fn arc(&self, c: PointD, from: PointD, sweep: f64, out: &mut Vec<PointD>) {
        let steps = self.arc_steps(sweep.abs());
        let a0 = from.y.atan2(from.x);
        for k in 1..steps {
            let a = a0 + sweep * k as f64 / steps as f64;
            out.push(PointD::new(c.x + self.hw * a.cos(), c.y + self.hw * a.sin()));
        }
    }

    /// Segments needed so that chords stay within the tolerance of the circle.
    fn arc_steps(&self, sweep: f64) -> usize {
        let da = if self.tolerance < self.hw {
            2.0 * (1.0 - self.tolerance / self.hw).acos()
        } else {
            PI / 2.0
        };
        if !(da > 0.0) {
            return MAX_ARC_STEPS;
        }
        ((sweep / da).ceil() as usize).clamp(1, MAX_ARC_STEPS)
    }

    /// Cap shape for a run with no length.
    fn dot(&self, p: PointD, d: PointD, out: &mut Path) {
        let mut ring = Vec::new();
        match self.cap {
            LineCap::Butt => return,
            LineCap::Round => {
                let from = PointD::new(self.hw, 0.0);
                ring.push(p + from);
                self.arc(p, from, 2.0 * PI, &mut ring);
            }
            LineCap::Square => {
                let n = normal(d, self.hw);
                let e = d * self.hw;
                ring.push(p - e + n);
                ring.push(p + e + n);
                ring.push(p + e - n);
                ring.push(p - e - n);
            }
        }
        emit_ring(&ring, out);
    }
}

fn emit_ring(ring: &[PointD], out: &mut Path) {
    let mut it = ring.iter();
    if let Some(first) = it.next() {
        out.move_to(first.x, first.y);
        for p in it {
            out.line_to(p.x, p.y);
        }
        out.close_path();
    }
}
