//! Pinhole calibration derived from the sensor geometry.
//!
//! The range finder has no lens distortion, so its calibration is fully
//! determined by image size and horizontal field of view:
//!
//! ```text
//! fx = 0.5 * width  / tan(0.5 * fov)
//! fy = 0.5 * height / tan(0.5 * fov)
//! cx = width / 2,  cy = height / 2
//! ```

use crate::error::{BridgeError, Result};
use crate::transport::Header;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Single precision view of the calibration, as consumed per pixel by the
/// point cloud projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl CalibrationRecord {
    /// Derive the calibration for a `width x height` sensor with field of
    /// view `fov` radians.
    pub fn derive(width: u32, height: u32, fov: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BridgeError::EmptyGeometry { width, height });
        }
        if !fov.is_finite() || fov <= 0.0 || fov >= core::f64::consts::PI {
            return Err(BridgeError::DegenerateFieldOfView(fov));
        }

        let half_fov_tan = (0.5 * fov).tan();
        let record = Self {
            width,
            height,
            fx: 0.5 * f64::from(width) / half_fov_tan,
            fy: 0.5 * f64::from(height) / half_fov_tan,
            cx: f64::from(width) / 2.0,
            cy: f64::from(height) / 2.0,
        };

        info!(
            width,
            height,
            fov,
            fx = record.fx,
            fy = record.fy,
            "derived range finder calibration"
        );

        Ok(record)
    }

    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics {
            fx: self.fx as f32,
            fy: self.fy as f32,
            cx: self.cx as f32,
            cy: self.cy as f32,
        }
    }

    /// Row-major `K = [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
    #[rustfmt::skip]
    pub fn intrinsic_matrix(&self) -> [f64; 9] {
        [
            self.fx, 0.0, self.cx,
            0.0, self.fy, self.cy,
            0.0, 0.0, 1.0,
        ]
    }

    /// Row-major `P = [K | 0]`.
    #[rustfmt::skip]
    pub fn projection_matrix(&self) -> [f64; 12] {
        [
            self.fx, 0.0, self.cx, 0.0,
            0.0, self.fy, self.cy, 0.0,
            0.0, 0.0, 1.0, 0.0,
        ]
    }

    pub fn to_camera_info(&self, header: Header) -> CameraInfo {
        CameraInfo {
            header,
            height: self.height,
            width: self.width,
            distortion_model: DistortionModel::PlumbBob,
            d: [0.0; 5],
            k: self.intrinsic_matrix(),
            r: IDENTITY_3X3,
            p: self.projection_matrix(),
        }
    }
}

pub fn derive_calibration(width: u32, height: u32, fov: f64) -> Result<CalibrationRecord> {
    CalibrationRecord::derive(width, height, fov)
}

const IDENTITY_3X3: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistortionModel {
    #[serde(rename = "plumb_bob")]
    PlumbBob,
}

impl DistortionModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistortionModel::PlumbBob => "plumb_bob",
        }
    }
}

/// Calibration message published once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub distortion_model: DistortionModel,
    pub d: [f64; 5],
    pub k: [f64; 9],
    pub r: [f64; 9],
    pub p: [f64; 12],
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

    #[test]
    fn test_principal_point_is_image_center() {
        for (width, height) in [(640, 480), (2, 1), (1, 1), (101, 37)] {
            let record = CalibrationRecord::derive(width, height, FRAC_PI_3).unwrap();
            assert_eq!(record.cx, f64::from(width) / 2.0);
            assert_eq!(record.cy, f64::from(height) / 2.0);
        }
    }

    #[test]
    fn test_square_sensor_has_equal_focal_lengths() {
        let square = CalibrationRecord::derive(64, 64, 1.0).unwrap();
        assert_eq!(square.fx, square.fy);

        let wide = CalibrationRecord::derive(64, 48, 1.0).unwrap();
        assert_ne!(wide.fx, wide.fy);
        assert!(wide.fx > wide.fy);
    }

    #[test]
    fn test_quarter_turn_fov() {
        let record = derive_calibration(2, 1, FRAC_PI_2).unwrap();
        assert!((record.fx - 1.0).abs() < 1e-12);
        assert!((record.fy - 0.5).abs() < 1e-12);
        assert_eq!(record.cx, 1.0);
        assert_eq!(record.cy, 0.5);

        let intrinsics = record.intrinsics();
        assert_eq!(intrinsics.fx, 1.0);
        assert_eq!(intrinsics.cx, 1.0);
        assert_eq!(intrinsics.cy, 0.5);
    }

    #[test]
    fn test_degenerate_field_of_view_rejected() {
        for fov in [0.0, -0.1, PI, 4.0, f64::NAN, f64::INFINITY] {
            let result = CalibrationRecord::derive(4, 4, fov);
            assert!(matches!(result, Err(BridgeError::DegenerateFieldOfView(_))), "fov {fov}");
        }
    }

    #[test]
    fn test_empty_geometry_rejected() {
        assert_eq!(
            CalibrationRecord::derive(0, 10, 1.0),
            Err(BridgeError::EmptyGeometry { width: 0, height: 10 })
        );
    }

    #[test]
    fn test_camera_info_layout() {
        let record = CalibrationRecord::derive(8, 6, FRAC_PI_2).unwrap();
        let info = record.to_camera_info(Header::new("depth").unwrap());

        assert_eq!(info.width, 8);
        assert_eq!(info.height, 6);
        assert_eq!(info.distortion_model.as_str(), "plumb_bob");
        assert_eq!(info.d, [0.0; 5]);
        assert_eq!(info.r, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

        assert_eq!(info.k[0], record.fx);
        assert_eq!(info.k[2], 4.0);
        assert_eq!(info.k[4], record.fy);
        assert_eq!(info.k[5], 3.0);
        assert_eq!(info.k[8], 1.0);

        // P is K with a zero fourth column.
        for row in 0..3 {
            assert_eq!(&info.p[row * 4..row * 4 + 3], &info.k[row * 3..row * 3 + 3]);
            assert_eq!(info.p[row * 4 + 3], 0.0);
        }
    }

    #[test]
    fn test_camera_info_serializes_distortion_model_name() {
        let record = CalibrationRecord::derive(4, 4, 1.0).unwrap();
        let info = record.to_camera_info(Header::new("depth").unwrap());
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"distortion_model\":\"plumb_bob\""));
    }
}
