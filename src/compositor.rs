//! Porter-Duff operators and separable blend modes.
//!
//! All colors are premultiplied. Coverage scales the source before the
//! operator runs, for every operator: `Over` at 50% coverage behaves like a
//! half transparent source, and `Source` at 50% coverage writes that half
//! transparent source.
//!
//! Pixels with zero coverage are never read or written.

use crate::basics::{cover_to_unit, CoverType};
use crate::color::{PremulColor, Rgba8};
use crate::pixmap::BYTES_PER_PIXEL;

/// Compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    Clear,
    Source,
    #[default]
    Over,
    In,
    Out,
    Atop,
    Dest,
    DestOver,
    DestIn,
    DestOut,
    DestAtop,
    Xor,
    Add,
    Saturate,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl Operator {

    /// Porter-Duff factors `(Fa, Fb)` for source and destination alpha.
    /// `None` for the non-linear operators.
    pub fn factors(self, sa: f64, da: f64) -> Option<(f64, f64)> {
        let f = match self {
            Operator::Clear => (0.0, 0.0),
            Operator::Source => (1.0, 0.0),
            Operator::Over => (1.0, 1.0 - sa),
            Operator::In => (da, 0.0),
            Operator::Out => (1.0 - da, 0.0),
            Operator::Atop => (da, 1.0 - sa),
            Operator::Dest => (0.0, 1.0),
            Operator::DestOver => (1.0 - da, 1.0),
            Operator::DestIn => (0.0, sa),
            Operator::DestOut => (0.0, 1.0 - sa),
            Operator::DestAtop => (1.0 - da, sa),
            Operator::Xor => (1.0 - da, 1.0 - sa),
            Operator::Add => (1.0, 1.0),
            Operator::Saturate => {
                let fa = if sa > 0.0 { ((1.0 - da) / sa).min(1.0) } else { 1.0 };
                (fa, 1.0)
            }
            _ => return None,
        };
        Some(f)
    }
}

#[inline]
fn porter_duff(s: &PremulColor, d: &PremulColor, fa: f64, fb: f64) -> PremulColor {
    PremulColor::new(
        s.r * fa + d.r * fb,
        s.g * fa + d.g * fb,
        s.b * fa + d.b * fb,
        s.a * fa + d.a * fb,
    )
}

// ---- Separable blend functions on premultiplied channels.
// Each returns Sca.(1 - Da) + Dca.(1 - Sa) + Sa.Da.B(Sc, Dc).

#[inline]
fn overlay(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    hard_light(sca, dca, sa, da)
}

#[inline]
fn hard_light(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let rest = sca * (1.0 - da) + dca * (1.0 - sa);
    if 2.0 * sca <= sa {
        2.0 * sca * dca + rest
    } else {
        sa * da - 2.0 * (da - dca) * (sa - sca) + rest
    }
}

#[inline]
fn color_dodge(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let rest = sca * (1.0 - da) + dca * (1.0 - sa);
    if dca <= 0.0 {
        rest
    } else if sca >= sa {
        sa * da + rest
    } else {
        sa * da * (dca * sa / (da * (sa - sca))).min(1.0) + rest
    }
}

#[inline]
fn color_burn(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let rest = sca * (1.0 - da) + dca * (1.0 - sa);
    if dca >= da {
        sa * da + rest
    } else if sca <= 0.0 {
        rest
    } else {
        sa * da * (1.0 - ((da - dca) * sa / (da * sca)).min(1.0)) + rest
    }
}

#[inline]
fn soft_light(dca: f64, sca: f64, da: f64, sa: f64) -> f64 {
    let cs = sca / sa;
    let cd = dca / da;
    let b = if cs <= 0.5 {
        cd - (1.0 - 2.0 * cs) * cd * (1.0 - cd)
    } else {
        let g = if cd <= 0.25 {
            ((16.0 * cd - 12.0) * cd + 4.0) * cd
        } else {
            cd.sqrt()
        };
        cd + (2.0 * cs - 1.0) * (g - cd)
    };
    sca * (1.0 - da) + dca * (1.0 - sa) + sa * da * b
}

fn blend(op: Operator, s: &PremulColor, d: &PremulColor) -> PremulColor {
    let (sa, da) = (s.a, d.a);
    if da <= 0.0 {
        // over an empty destination every blend mode reduces to the source
        return *s;
    }
    let channel = |sc: f64, dc: f64| -> f64 {
        match op {
            Operator::Multiply => sc * dc + sc * (1.0 - da) + dc * (1.0 - sa),
            Operator::Screen => sc + dc - sc * dc,
            Operator::Overlay => overlay(dc, sc, da, sa),
            Operator::Darken => (sc * da).min(dc * sa) + sc * (1.0 - da) + dc * (1.0 - sa),
            Operator::Lighten => (sc * da).max(dc * sa) + sc * (1.0 - da) + dc * (1.0 - sa),
            Operator::ColorDodge => color_dodge(dc, sc, da, sa),
            Operator::ColorBurn => color_burn(dc, sc, da, sa),
            Operator::HardLight => hard_light(dc, sc, da, sa),
            Operator::SoftLight => soft_light(dc, sc, da, sa),
            Operator::Difference => sc + dc - 2.0 * (sc * da).min(dc * sa),
            Operator::Exclusion => sc * da + dc * sa - 2.0 * sc * dc + sc * (1.0 - da) + dc * (1.0 - sa),
            _ => dc,
        }
    };
    PremulColor::new(
        channel(s.r, d.r),
        channel(s.g, d.g),
        channel(s.b, d.b),
        sa + da - sa * da,
    )
}

/// Apply `op` at full strength to an already coverage-scaled source.
fn apply(op: Operator, s: &PremulColor, d: &PremulColor) -> PremulColor {
    match op.factors(s.a, d.a) {
        Some((fa, fb)) => porter_duff(s, d, fa, fb),
        None => {
            if s.a <= 0.0 {
                *d
            } else {
                blend(op, s, d)
            }
        }
    }
}

/// Composite one premultiplied source sample onto one destination pixel.
///
/// `coverage` is clamped into `[0, 1]`. The result is clipped so alpha lies
/// in `[0, 1]` and every channel in `[0, alpha]`.
pub fn composite(op: Operator, src: PremulColor, coverage: f64, dst: PremulColor) -> PremulColor {
    let cov = if coverage > 0.0 { coverage.min(1.0) } else { 0.0 };
    if cov <= 0.0 || op == Operator::Dest {
        return dst;
    }
    let s = if cov >= 1.0 { src } else { src.scale(cov) };
    apply(op, &s, &dst).clip()
}

/// Composite a run of source colors onto RGBA8 destination bytes.
///
/// `dst` holds `src.len()` pixels; `covers` holds one coverage byte per pixel.
pub fn composite_span(op: Operator, dst: &mut [u8], src: &[PremulColor], covers: &[CoverType]) {
    if op == Operator::Dest {
        return;
    }
    for ((px, s), &cover) in dst
        .chunks_exact_mut(BYTES_PER_PIXEL)
        .zip(src.iter())
        .zip(covers.iter())
    {
        if cover == 0 {
            continue;
        }
        if op == Operator::Over && cover == 255 && s.a >= 1.0 {
            Rgba8::from_premul(s).write_to(px);
            continue;
        }
        let d = PremulColor::from(Rgba8::from_slice(px));
        let out = composite(op, *s, cover_to_unit(cover), d);
        Rgba8::from_premul(&out).write_to(px);
    }
}
