//! # vecraster
//!
//! Software rendering core for 2D vector graphics. Paths are filled into
//! premultiplied RGBA8 pixel buffers with exact-area anti-aliasing, solid,
//! gradient or image paint, and Porter-Duff compositing.
//!
//! ```
//! use vecraster::{fill, Color, FillRule, Matrix, Operator, Paint, Path, Pixmap};
//!
//! let mut pixmap = Pixmap::new(32, 32).unwrap();
//! let mut path = Path::new();
//! path.rectangle(4.0, 4.0, 24.0, 24.0);
//! fill(
//!     &path,
//!     &Paint::Solid(Color::rgb(1.0, 0.0, 0.0)),
//!     FillRule::NonZero,
//!     &Matrix::IDENTITY,
//!     Operator::Over,
//!     &mut pixmap.as_mut(),
//! )
//! .unwrap();
//! assert_eq!(pixmap.pixel(10, 10).unwrap().r, 255);
//! ```
//!
//! ## Architecture
//!
//! A fill runs through five stages:
//!
//! 1. **Matrix** maps the user-space path into device space.
//! 2. **Flattener** replaces curves by polylines within a device tolerance.
//! 3. **Rasterizer** accumulates exact-area cells and sweeps them into
//!    per-row coverage spans.
//! 4. **Pattern sampler** produces the paint color of each covered pixel.
//! 5. **Compositor** merges paint and coverage into the destination.
//!
//! Stroking converts the stroke outline into an ordinary path first and
//! then fills it.

// Foundation types
pub mod basics;
pub mod color;
pub mod error;
pub mod matrix;

// Geometry
pub mod flatten;
pub mod path;
pub mod stroke;

// Scanline rasterizer
pub mod cells;
pub mod edge;
pub mod rasterizer;
pub mod scanline;

// Paint and pixels
pub mod compositor;
pub mod gradient;
pub mod pattern;
pub mod pixmap;

// Drivers
pub mod renderer;

pub use basics::{FillRule, PointD, RectD, RectI};
pub use color::{Color, PremulColor, Rgba8};
pub use compositor::{composite, Operator};
pub use error::{RasterError, Result};
pub use gradient::{ColorStop, ColorStops, Extend, LinearGradient, RadialGradient};
pub use matrix::Matrix;
pub use path::{Path, PathSegment};
pub use pattern::{sample, Filter, Paint, SurfacePattern};
pub use pixmap::{Pixmap, PixmapMut};
pub use rasterizer::Antialias;
pub use renderer::{fill, fill_with_options, stroke, FillOptions, Renderer};
pub use stroke::{stroke_as_fill, LineCap, LineJoin, StrokeStyle};
