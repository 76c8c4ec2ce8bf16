//! Range image to point cloud back-projection.
//!
//! Each pixel `(i, j)` with range `x` becomes the point
//!
//! ```text
//! x = range
//! y = -(i - cx) * x / fx
//! z = -(j - cy) * x / fy
//! ```
//!
//! stored at point index `i + j * width`. Image coordinates grow right and
//! down while the output frame has y to the left and z up, hence the sign
//! flips. Non-finite ranges are propagated, never filtered.

use crate::calibration::Intrinsics;
use crate::error::{BridgeError, Result};
use crate::transport::Header;
use heapless::Vec;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const POINT_STEP: u32 = 12;
const FLOAT_BYTES: usize = core::mem::size_of::<f32>();

const_assert_eq!(POINT_STEP as usize, 3 * FLOAT_BYTES);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointFieldType {
    Float32 = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointField {
    pub name: Axis,
    pub offset: u32,
    pub datatype: PointFieldType,
    pub count: u32,
}

pub type PointFields = Vec<PointField, 3>;

fn xyz_fields() -> PointFields {
    let mut fields = PointFields::new();
    for (index, name) in [Axis::X, Axis::Y, Axis::Z].into_iter().enumerate() {
        // Capacity matches the three axes.
        let _ = fields.push(PointField {
            name,
            offset: (index * FLOAT_BYTES) as u32,
            datatype: PointFieldType::Float32,
            count: 1,
        });
    }
    fields
}

/// Back-project one pixel.
#[inline]
pub fn back_project(i: u32, j: u32, range: f32, k: &Intrinsics) -> [f32; 3] {
    let x = range;
    let y = -(i as f32 - k.cx) * x / k.fx;
    let z = -(j as f32 - k.cy) * x / k.fy;
    [x, y, z]
}

/// Point cloud artifact, one point per range pixel, organised as the source
/// image (`width x height`).
///
/// Like [`crate::depth_image::DepthImage`] the buffer is owned, sized once
/// and overwritten by [`PointCloud::project`]; it keeps the last good frame
/// until the next successful projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: PointFields,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    #[serde(with = "serde_bytes")]
    pub data: alloc::vec::Vec<u8>,
    /// False: out-of-range pixels stay in the cloud as non-finite points.
    pub is_dense: bool,
}

impl PointCloud {
    pub fn new(width: u32, height: u32, header: Header) -> Self {
        let size = POINT_STEP as usize * width as usize * height as usize;
        Self {
            header,
            height,
            width,
            fields: xyz_fields(),
            is_bigendian: false,
            point_step: POINT_STEP,
            row_step: POINT_STEP * width,
            data: alloc::vec![0; size],
            is_dense: false,
        }
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite every point from a row-major range buffer.
    ///
    /// Fails without touching the cloud if `ranges` does not cover the
    /// sensor geometry.
    pub fn project(&mut self, ranges: &[f32], intrinsics: &Intrinsics) -> Result<()> {
        if ranges.len() != self.len() {
            return Err(BridgeError::BufferSize {
                expected: self.len(),
                actual: ranges.len(),
            });
        }
        if self.is_empty() {
            return Ok(());
        }

        let width = self.width as usize;
        let rows = self.data.chunks_exact_mut(self.row_step as usize);
        for (j, (row, row_ranges)) in rows.zip(ranges.chunks_exact(width)).enumerate() {
            let points = row.chunks_exact_mut(POINT_STEP as usize);
            for (i, (point, &range)) in points.zip(row_ranges).enumerate() {
                let xyz = back_project(i as u32, j as u32, range, intrinsics);
                for (slot, value) in point.chunks_exact_mut(FLOAT_BYTES).zip(xyz) {
                    slot.copy_from_slice(&value.to_le_bytes());
                }
            }
        }

        Ok(())
    }

    /// Point at linear index `i + j * width`.
    pub fn point(&self, index: usize) -> Option<[f32; 3]> {
        let start = index.checked_mul(POINT_STEP as usize)?;
        let bytes = self.data.get(start..start + POINT_STEP as usize)?;
        Some(decode_point(bytes))
    }

    pub fn point_at(&self, i: u32, j: u32) -> Option<[f32; 3]> {
        if i >= self.width || j >= self.height {
            return None;
        }
        self.point(i as usize + j as usize * self.width as usize)
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data.chunks_exact(POINT_STEP as usize).map(decode_point)
    }
}

fn decode_point(bytes: &[u8]) -> [f32; 3] {
    let mut xyz = [0.0f32; 3];
    for (value, chunk) in xyz.iter_mut().zip(bytes.chunks_exact(FLOAT_BYTES)) {
        let mut raw = [0u8; FLOAT_BYTES];
        raw.copy_from_slice(chunk);
        *value = f32::from_le_bytes(raw);
    }
    xyz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationRecord;
    use core::f64::consts::FRAC_PI_2;

    fn cloud_for(record: &CalibrationRecord) -> PointCloud {
        PointCloud::new(record.width, record.height, Header::new("range_finder").unwrap())
    }

    #[test]
    fn test_layout() {
        let cloud = PointCloud::new(4, 3, Header::default());
        assert_eq!(cloud.point_step, 12);
        assert_eq!(cloud.row_step, 48);
        assert_eq!(cloud.data.len(), 144);
        assert_eq!(cloud.len(), 12);
        assert!(!cloud.is_bigendian);

        let offsets: alloc::vec::Vec<(Axis, u32)> =
            cloud.fields.iter().map(|f| (f.name, f.offset)).collect();
        assert_eq!(offsets, [(Axis::X, 0), (Axis::Y, 4), (Axis::Z, 8)]);
        assert!(cloud.fields.iter().all(|f| f.datatype == PointFieldType::Float32 && f.count == 1));
        assert_eq!(PointFieldType::Float32 as u8, 7);
    }

    #[test]
    fn test_two_pixel_scene() {
        let record = CalibrationRecord::derive(2, 1, FRAC_PI_2).unwrap();
        let intrinsics = record.intrinsics();
        assert_eq!(intrinsics.fy, 0.5);

        let mut cloud = cloud_for(&record);
        cloud.project(&[2.0, 2.0], &intrinsics).unwrap();

        // y = -(0 - 1) * 2 / 1, z = -(0 - 0.5) * 2 / 0.5
        assert_eq!(cloud.point(0), Some([2.0, 2.0, 2.0]));
        assert_eq!(cloud.point(1), Some([2.0, 0.0, 2.0]));
        assert_eq!(cloud.point(2), None);
    }

    #[test]
    fn test_principal_ray_has_no_lateral_offset() {
        let record = CalibrationRecord::derive(4, 4, 1.2).unwrap();
        let mut cloud = cloud_for(&record);
        cloud.project(&[3.5; 16], &record.intrinsics()).unwrap();

        assert_eq!(cloud.point_at(2, 2), Some([3.5, 0.0, 0.0]));
    }

    #[test]
    fn test_sign_convention() {
        let record = CalibrationRecord::derive(5, 5, 1.0).unwrap();
        let mut cloud = cloud_for(&record);
        cloud.project(&[1.0; 25], &record.intrinsics()).unwrap();

        // Left of centre maps to +y, above centre maps to +z.
        let top_left = cloud.point_at(0, 0).unwrap();
        assert!(top_left[1] > 0.0);
        assert!(top_left[2] > 0.0);

        let bottom_right = cloud.point_at(4, 4).unwrap();
        assert!(bottom_right[1] < 0.0);
        assert!(bottom_right[2] < 0.0);
    }

    #[test]
    fn test_point_index_is_row_major() {
        let record = CalibrationRecord::derive(3, 2, 1.0).unwrap();
        let ranges = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut cloud = cloud_for(&record);
        cloud.project(&ranges, &record.intrinsics()).unwrap();

        for j in 0..2 {
            for i in 0..3 {
                let index = (i + j * 3) as usize;
                let point = cloud.point(index).unwrap();
                assert_eq!(point[0], ranges[index]);
                assert_eq!(Some(point), cloud.point_at(i, j));
            }
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let record = CalibrationRecord::derive(6, 4, 0.9).unwrap();
        let ranges: alloc::vec::Vec<f32> = (0..24).map(|v| 0.5 + v as f32 * 0.25).collect();
        let mut cloud = cloud_for(&record);

        cloud.project(&ranges, &record.intrinsics()).unwrap();
        let first = cloud.clone();
        cloud.project(&ranges, &record.intrinsics()).unwrap();

        assert_eq!(cloud.data, first.data);
    }

    #[test]
    fn test_non_finite_ranges_propagate() {
        let record = CalibrationRecord::derive(2, 1, 1.0).unwrap();
        let mut cloud = cloud_for(&record);
        cloud.project(&[f32::INFINITY, f32::NAN], &record.intrinsics()).unwrap();

        let far = cloud.point(0).unwrap();
        assert_eq!(far[0], f32::INFINITY);
        assert_eq!(far[1], f32::INFINITY);

        let unknown = cloud.point(1).unwrap();
        assert!(unknown[0].is_nan());
    }

    #[test]
    fn test_size_mismatch_leaves_cloud_untouched() {
        let record = CalibrationRecord::derive(2, 2, 1.0).unwrap();
        let mut cloud = cloud_for(&record);
        cloud.project(&[1.0; 4], &record.intrinsics()).unwrap();
        let before = cloud.data.clone();

        assert!(cloud.project(&[1.0; 5], &record.intrinsics()).is_err());
        assert_eq!(cloud.data, before);
    }
}
