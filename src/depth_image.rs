use crate::error::{BridgeError, Result};
use crate::transport::Header;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const BYTES_PER_PIXEL: usize = 4;

const_assert_eq!(BYTES_PER_PIXEL, core::mem::size_of::<f32>());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelEncoding {
    /// One 32-bit float channel per pixel.
    #[serde(rename = "32FC1")]
    Float32C1,
}

impl PixelEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelEncoding::Float32C1 => "32FC1",
        }
    }
}

/// Range image artifact.
///
/// The pixel buffer is allocated once for the sensor geometry and rewritten
/// in place by [`DepthImage::encode`]. Its contents are valid as of the last
/// successful encode; ticks without a range buffer leave it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthImage {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub encoding: PixelEncoding,
    pub is_bigendian: bool,
    /// Row length in bytes.
    pub step: u32,
    #[serde(with = "serde_bytes")]
    pub data: alloc::vec::Vec<u8>,
}

impl DepthImage {
    pub fn new(width: u32, height: u32, header: Header) -> Self {
        let size = BYTES_PER_PIXEL * width as usize * height as usize;
        Self {
            header,
            height,
            width,
            encoding: PixelEncoding::Float32C1,
            is_bigendian: false,
            step: BYTES_PER_PIXEL as u32 * width,
            data: alloc::vec![0; size],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Copy a row-major range buffer into the image as little-endian floats.
    ///
    /// No scaling or filtering is applied. On a size mismatch the image is
    /// left exactly as it was.
    pub fn encode(&mut self, ranges: &[f32]) -> Result<()> {
        if ranges.len() != self.pixel_count() {
            return Err(BridgeError::BufferSize {
                expected: self.pixel_count(),
                actual: ranges.len(),
            });
        }

        for (pixel, range) in self.data.chunks_exact_mut(BYTES_PER_PIXEL).zip(ranges) {
            pixel.copy_from_slice(&range.to_le_bytes());
        }

        Ok(())
    }

    /// Range stored at pixel `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let bytes = self.data.get(offset..offset + BYTES_PER_PIXEL)?;
        let mut raw = [0u8; BYTES_PER_PIXEL];
        raw.copy_from_slice(bytes);
        Some(f32::from_le_bytes(raw))
    }

    /// All ranges in row-major order.
    pub fn ranges(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.chunks_exact(BYTES_PER_PIXEL).map(|bytes| {
            let mut raw = [0u8; BYTES_PER_PIXEL];
            raw.copy_from_slice(bytes);
            f32::from_le_bytes(raw)
        })
    }
}
