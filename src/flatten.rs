//! Curve flattening.
//!
//! Maps a [`Path`] into device space and replaces every cubic segment with
//! a polyline whose distance from the true curve never exceeds the
//! tolerance. Subdivision is recursive de Casteljau splitting at `t = 0.5`.
//!
//! The flatness test bounds the distance of both control points to the
//! chord *segment* (not the infinite line). Every point of a Bézier piece
//! is a convex combination of its control points, so its distance to the
//! chord is bounded by the larger of the two control-point distances.
//! Collinear control points that overshoot the end points are therefore
//! subdivided like any other curve.

use log::trace;

use crate::basics::PointD;
use crate::matrix::Matrix;
use crate::path::{Path, PathSegment};

/// Default maximum deviation in device pixels.
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Tolerances below this are raised to it.
pub const MIN_TOLERANCE: f64 = 1e-6;

/// Subdivision depth ceiling. At most `2^16` pieces per curve; deeper
/// curves keep their residual error.
pub const CURVE_RECURSION_LIMIT: u32 = 16;

/// A flattened subpath in device space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<PointD>,
    /// The subpath ended with an explicit `ClosePath`.
    pub closed: bool,
}

/// Converts paths into polylines at a fixed tolerance.
#[derive(Debug, Clone)]
pub struct Flattener {
    tolerance: f64,
    tolerance_square: f64,
    ceiling_hits: usize,
}

impl Flattener {
    pub fn new(tolerance: f64) -> Self {
        let tolerance = sanitize_tolerance(tolerance);
        Self {
            tolerance,
            tolerance_square: tolerance * tolerance,
            ceiling_hits: 0,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of curves that stopped at [`CURVE_RECURSION_LIMIT`] since creation.
    pub fn ceiling_hits(&self) -> usize {
        self.ceiling_hits
    }

    /// Flatten `path` after mapping it through `m`.
    pub fn flatten_path(&mut self, path: &Path, m: &Matrix) -> Vec<Polyline> {
        let mut out = Vec::new();
        self.flatten_path_into(path, m, &mut out);
        out
    }

    /// Like [`flatten_path`](Self::flatten_path), appending to `out`.
    pub fn flatten_path_into(&mut self, path: &Path, m: &Matrix, out: &mut Vec<Polyline>) {
        let hits_before = self.ceiling_hits;
        for sub in path.subpaths() {
            let mut line = Polyline {
                points: vec![m.map_point(sub.start())],
                closed: false,
            };
            for seg in sub.segments() {
                match *seg {
                    PathSegment::MoveTo(_) => {}
                    PathSegment::LineTo(p) => line.points.push(m.map_point(p)),
                    PathSegment::CurveTo(c1, c2, p3) => {
                        let p0 = line.points.last().copied().unwrap_or_default();
                        self.flatten_cubic(
                            p0,
                            m.map_point(c1),
                            m.map_point(c2),
                            m.map_point(p3),
                            &mut line.points,
                        );
                    }
                    PathSegment::ClosePath => line.closed = true,
                }
            }
            out.push(line);
        }
        if self.ceiling_hits > hits_before {
            trace!(
                "flatten: {} curve(s) hit the recursion ceiling at tolerance {}",
                self.ceiling_hits - hits_before,
                self.tolerance
            );
        }
    }

    /// Append the flattened points of a cubic to `out`, excluding `p0`.
    /// The last appended point is always exactly `p3`.
    pub fn flatten_cubic(&mut self, p0: PointD, p1: PointD, p2: PointD, p3: PointD, out: &mut Vec<PointD>) {
        if !(p0.is_finite() && p1.is_finite() && p2.is_finite() && p3.is_finite()) {
            out.push(p3);
            return;
        }
        self.recursive_bezier(p0, p1, p2, p3, 0, out);
    }

    fn recursive_bezier(&mut self, p1: PointD, p2: PointD, p3: PointD, p4: PointD, level: u32, out: &mut Vec<PointD>) {
        if level >= CURVE_RECURSION_LIMIT {
            self.ceiling_hits += 1;
            out.push(p4);
            return;
        }

        let d2 = dist_square_to_segment(p2, p1, p4);
        let d3 = dist_square_to_segment(p3, p1, p4);
        if d2 <= self.tolerance_square && d3 <= self.tolerance_square {
            out.push(p4);
            return;
        }

        // Midpoints of the control polygon
        let p12 = p1.lerp(p2, 0.5);
        let p23 = p2.lerp(p3, 0.5);
        let p34 = p3.lerp(p4, 0.5);
        let p123 = p12.lerp(p23, 0.5);
        let p234 = p23.lerp(p34, 0.5);
        let p1234 = p123.lerp(p234, 0.5);

        self.recursive_bezier(p1, p12, p123, p1234, level + 1, out);
        self.recursive_bezier(p1234, p234, p34, p4, level + 1, out);
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

fn sanitize_tolerance(tolerance: f64) -> f64 {
    if tolerance.is_nan() {
        DEFAULT_TOLERANCE
    } else {
        tolerance.max(MIN_TOLERANCE)
    }
}

/// Squared distance from `p` to the segment `a`-`b`.
pub fn dist_square_to_segment(p: PointD, a: PointD, b: PointD) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let qx = a.x + dx * t - p.x;
    let qy = a.y + dy * t - p.y;
    qx * qx + qy * qy
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic_point(p: [PointD; 4], t: f64) -> PointD {
        let mt = 1.0 - t;
        p[0] * (mt * mt * mt) + p[1] * (3.0 * mt * mt * t) + p[2] * (3.0 * mt * t * t) + p[3] * (t * t * t)
    }

    /// Largest distance from a densely sampled curve point to the polyline.
    fn max_deviation(p: [PointD; 4], poly: &[PointD]) -> f64 {
        let mut worst: f64 = 0.0;
        for i in 0..=2000 {
            let c = cubic_point(p, i as f64 / 2000.0);
            let best = poly
                .windows(2)
                .map(|w| dist_square_to_segment(c, w[0], w[1]))
                .fold(f64::INFINITY, f64::min)
                .sqrt();
            worst = worst.max(best);
        }
        worst
    }

    fn flatten(p: [PointD; 4], tol: f64) -> Vec<PointD> {
        let mut f = Flattener::new(tol);
        let mut pts = vec![p[0]];
        f.flatten_cubic(p[0], p[1], p[2], p[3], &mut pts);
        pts
    }

    fn pt(x: f64, y: f64) -> PointD {
        PointD::new(x, y)
    }

    #[test]
    fn test_deviation_within_tolerance() {
        let curves = [
            [pt(0.0, 0.0), pt(0.0, 100.0), pt(100.0, 100.0), pt(100.0, 0.0)],
            [pt(10.0, 10.0), pt(300.0, -50.0), pt(-200.0, 80.0), pt(40.0, 40.0)],
            // cusp
            [pt(0.0, 0.0), pt(100.0, 100.0), pt(0.0, 100.0), pt(100.0, 0.0)],
            // tiny
            [pt(5.0, 5.0), pt(5.1, 5.3), pt(5.2, 5.0), pt(5.3, 5.3)],
        ];
        for &tol in &[1.0, 0.25, 0.1, 0.01] {
            for c in &curves {
                let poly = flatten(*c, tol);
                assert_eq!(*poly.last().unwrap(), c[3]);
                let dev = max_deviation(*c, &poly);
                assert!(dev <= tol + 1e-9, "deviation {} > {}", dev, tol);
            }
        }
    }

    #[test]
    fn test_collinear_control_points() {
        // control points overshoot both ends of the chord
        let c = [pt(0.0, 0.0), pt(150.0, 0.0), pt(-50.0, 0.0), pt(100.0, 0.0)];
        let poly = flatten(c, 0.1);
        assert!(poly.len() > 2);
        assert!(max_deviation(c, &poly) <= 0.1 + 1e-9);

        // collinear and inside the chord: a single piece suffices
        let c = [pt(0.0, 0.0), pt(30.0, 30.0), pt(60.0, 60.0), pt(90.0, 90.0)];
        assert_eq!(flatten(c, 0.1).len(), 2);
    }

    #[test]
    fn test_coincident_points() {
        let p = pt(7.0, 7.0);
        let poly = flatten([p, p, p, p], 0.1);
        assert_eq!(poly, vec![p, p]);
    }

    #[test]
    fn test_recursion_ceiling() {
        let c = [pt(0.0, 0.0), pt(1e12, 1e12), pt(-1e12, 1e12), pt(1.0, 0.0)];
        let mut f = Flattener::new(0.1);
        let mut pts = vec![c[0]];
        f.flatten_cubic(c[0], c[1], c[2], c[3], &mut pts);
        assert!(f.ceiling_hits() > 0);
        assert!(pts.len() <= (1 << CURVE_RECURSION_LIMIT) + 1);
    }

    #[test]
    fn test_non_finite_curve() {
        let mut f = Flattener::default();
        let mut pts = vec![pt(0.0, 0.0)];
        f.flatten_cubic(pts[0], pt(f64::NAN, 0.0), pt(1.0, 1.0), pt(2.0, 0.0), &mut pts);
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn test_tolerance_sanitized() {
        assert_eq!(Flattener::new(0.0).tolerance(), MIN_TOLERANCE);
        assert_eq!(Flattener::new(f64::NAN).tolerance(), DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_flatten_path_in_device_space() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0).line_to(1.0, 0.0).curve_to(1.0, 1.0, 0.0, 1.0, 0.0, 0.0).close_path();
        p.move_to(5.0, 5.0).line_to(6.0, 5.0);

        let mut f = Flattener::new(0.1);
        let lines = f.flatten_path(&p, &Matrix::scaling(100.0, 100.0));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].closed);
        assert!(!lines[1].closed);
        assert_eq!(lines[0].points[1], pt(100.0, 0.0));
        // the scaled curve needs many more pieces than the unscaled one
        let small = Flattener::new(0.1).flatten_path(&p, &Matrix::identity());
        assert!(lines[0].points.len() > small[0].points.len());
        assert_eq!(lines[1].points, vec![pt(500.0, 500.0), pt(600.0, 500.0)]);
    }
}
