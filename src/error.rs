//! Error type returned by the rendering entry points.

use std::collections::TryReserveError;

use thiserror::Error;

/// Failures surfaced by [`fill`](crate::renderer::fill) and friends.
///
/// Degenerate geometry is never an error; it simply produces no coverage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    /// A transform had to be inverted but its determinant is (nearly) zero.
    #[error("matrix is not invertible (determinant {determinant:e})")]
    InvalidMatrix { determinant: f64 },

    /// The paint cannot be evaluated.
    #[error("invalid pattern: {0}")]
    InvalidPattern(&'static str),

    /// Scratch storage for edges, cells or spans could not be allocated.
    #[error("out of memory while allocating {0}")]
    OutOfMemory(&'static str),

    /// The destination does not match the requested region or layout.
    #[error("buffer mismatch: {0}")]
    BufferMismatch(String),
}

impl RasterError {
    pub(crate) fn oom(what: &'static str) -> impl FnOnce(TryReserveError) -> RasterError {
        move |_| RasterError::OutOfMemory(what)
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = RasterError::InvalidMatrix { determinant: 0.0 };
        assert!(e.to_string().starts_with("matrix is not invertible"));

        let e = RasterError::InvalidPattern("gradient has no color stops");
        assert_eq!(e.to_string(), "invalid pattern: gradient has no color stops");

        let e = RasterError::BufferMismatch("stride 4 < 8".to_string());
        assert_eq!(e.to_string(), "buffer mismatch: stride 4 < 8");
    }

    #[test]
    fn test_oom_mapping() {
        let mut v: Vec<u64> = Vec::new();
        let err = v.try_reserve(usize::MAX).map_err(RasterError::oom("edges"));
        assert_eq!(err, Err(RasterError::OutOfMemory("edges")));
    }
}
