//! Premultiplied RGBA8 pixel buffers.
//!
//! [`Pixmap`] owns its bytes; [`PixmapMut`] borrows caller memory. Both use
//! a row stride of at least `width * 4` bytes, so rows may carry padding.

use crate::basics::RectI;
use crate::color::Rgba8;
use crate::error::{RasterError, Result};

pub const BYTES_PER_PIXEL: usize = 4;

/// Device coordinates are `i32`, so larger images cannot be addressed.
fn check_size(width: u32, height: u32) -> Result<()> {
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(RasterError::BufferMismatch(format!(
            "{}x{} exceeds the addressable size",
            width, height
        )));
    }
    Ok(())
}

fn check_layout(len: usize, width: u32, height: u32, stride: usize) -> Result<()> {
    check_size(width, height)?;
    let row_bytes = width as usize * BYTES_PER_PIXEL;
    if stride < row_bytes {
        return Err(RasterError::BufferMismatch(format!(
            "stride {} is smaller than {} bytes per row",
            stride, row_bytes
        )));
    }
    let needed = if height == 0 {
        0
    } else {
        (height as usize - 1)
            .checked_mul(stride)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or_else(|| RasterError::BufferMismatch("buffer size overflows".to_string()))?
    };
    if len < needed {
        return Err(RasterError::BufferMismatch(format!(
            "{} bytes provided, {}x{} with stride {} needs {}",
            len, width, height, stride, needed
        )));
    }
    Ok(())
}

// ============================================================================
// Pixmap
// ============================================================================

/// An owned premultiplied RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl Pixmap {
    /// Transparent image with tightly packed rows.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        let stride = width as usize * BYTES_PER_PIXEL;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(RasterError::OutOfMemory("pixmap"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(RasterError::oom("pixmap"))?;
        data.resize(len, 0);
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Wrap existing bytes after validating the layout.
    pub fn from_vec(data: Vec<u8>, width: u32, height: u32, stride: usize) -> Result<Self> {
        check_layout(data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Bytes of row `y`, without padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba8> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let off = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        Some(Rgba8::from_slice(&self.data[off..off + BYTES_PER_PIXEL]))
    }

    pub fn fill(&mut self, c: Rgba8) {
        self.as_mut().fill(c);
    }

    pub fn as_mut(&mut self) -> PixmapMut<'_> {
        PixmapMut {
            data: &mut self.data,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}

// ============================================================================
// PixmapMut
// ============================================================================

/// A mutable view of premultiplied RGBA8 pixels owned by the caller.
#[derive(Debug)]
pub struct PixmapMut<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> PixmapMut<'a> {
    pub fn from_bytes(data: &'a mut [u8], width: u32, height: u32, stride: usize) -> Result<Self> {
        check_layout(data.len(), width, height, stride)?;
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The whole image as a half-open rectangle.
    pub fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba8> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let off = y as usize * self.stride + x as usize * BYTES_PER_PIXEL;
        Some(Rgba8::from_slice(&self.data[off..off + BYTES_PER_PIXEL]))
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        &mut self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    pub fn fill(&mut self, c: Rgba8) {
        for y in 0..self.height {
            for px in self.row_mut(y).chunks_exact_mut(BYTES_PER_PIXEL) {
                c.write_to(px);
            }
        }
    }

    /// Raw bytes and stride, for splitting into row bands.
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }
}
