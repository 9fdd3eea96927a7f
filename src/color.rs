//! Color representations.
//!
//! - [`Color`]: straight-alpha, `f64` per channel; what callers write paints with.
//! - [`PremulColor`]: premultiplied `f64` working space used by sampling and compositing.
//! - [`Rgba8`]: premultiplied 8-bit pixel as stored in a [`Pixmap`](crate::pixmap::Pixmap).

use crate::basics::iround;

// ============================================================================
// Color (straight alpha)
// ============================================================================

/// Straight (non-premultiplied) RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Clamp every component into `[0, 1]`; NaN becomes `0`.
    pub fn clamped(&self) -> Color {
        Color::new(unit(self.r), unit(self.g), unit(self.b), unit(self.a))
    }

    /// Interpolate between `self` and `c` by `k`.
    pub fn lerp(&self, c: &Color, k: f64) -> Color {
        Color {
            r: self.r + (c.r - self.r) * k,
            g: self.g + (c.g - self.g) * k,
            b: self.b + (c.b - self.b) * k,
            a: self.a + (c.a - self.a) * k,
        }
    }

    pub fn premultiply(&self) -> PremulColor {
        let c = self.clamped();
        PremulColor::new(c.r * c.a, c.g * c.a, c.b * c.a, c.a)
    }
}

#[inline]
fn unit(v: f64) -> f64 {
    if v > 0.0 {
        v.min(1.0)
    } else {
        0.0
    }
}

// ============================================================================
// PremulColor
// ============================================================================

/// Premultiplied RGBA in `f64`. Channels are expected to satisfy `c <= a`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PremulColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl PremulColor {
    pub const TRANSPARENT: PremulColor = PremulColor::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn scale(&self, k: f64) -> PremulColor {
        PremulColor::new(self.r * k, self.g * k, self.b * k, self.a * k)
    }

    #[inline]
    pub fn add(&self, c: &PremulColor) -> PremulColor {
        PremulColor::new(self.r + c.r, self.g + c.g, self.b + c.b, self.a + c.a)
    }

    /// Clamp alpha into `[0, 1]` and colors into `[0, alpha]`.
    #[inline]
    pub fn clip(&self) -> PremulColor {
        let a = unit(self.a);
        let ch = |v: f64| if v > 0.0 { v.min(a) } else { 0.0 };
        PremulColor::new(ch(self.r), ch(self.g), ch(self.b), a)
    }

    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Recover straight alpha. Fully transparent colors come back as transparent black.
    pub fn demultiply(&self) -> Color {
        if self.a <= 0.0 {
            return Color::TRANSPARENT;
        }
        let inv = 1.0 / self.a;
        Color::new(self.r * inv, self.g * inv, self.b * inv, self.a).clamped()
    }
}

impl From<Rgba8> for PremulColor {
    #[inline]
    fn from(p: Rgba8) -> Self {
        PremulColor::new(
            Rgba8::to_double(p.r),
            Rgba8::to_double(p.g),
            Rgba8::to_double(p.b),
            Rgba8::to_double(p.a),
        )
    }
}

// ============================================================================
// Rgba8 (premultiplied, 8 bits per channel)
// ============================================================================

/// Premultiplied RGBA pixel with `u8` components, byte order R, G, B, A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BASE_MASK: u32 = 255;
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_double(v: u8) -> f64 {
        v as f64 / Self::BASE_MASK as f64
    }

    /// Unit value to `u8`, rounding to nearest and clamping.
    #[inline]
    pub fn from_double(v: f64) -> u8 {
        iround(unit(v) * Self::BASE_MASK as f64) as u8
    }

    /// Premultiply a straight color into a pixel.
    pub fn from_color(c: &Color) -> Self {
        Self::from_premul(&c.premultiply())
    }

    pub fn from_premul(c: &PremulColor) -> Self {
        let c = c.clip();
        Self {
            r: Self::from_double(c.r),
            g: Self::from_double(c.g),
            b: Self::from_double(c.b),
            a: Self::from_double(c.a),
        }
    }

    #[inline]
    pub fn from_slice(p: &[u8]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }

    #[inline]
    pub fn write_to(&self, p: &mut [u8]) {
        p[0] = self.r;
        p[1] = self.g;
        p[2] = self.b;
        p[3] = self.a;
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}
