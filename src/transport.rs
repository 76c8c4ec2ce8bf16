//! Transport-facing types: message headers, QoS profiles and the sink the
//! adapter hands finished artifacts to.

use crate::calibration::CameraInfo;
use crate::depth_image::DepthImage;
use crate::error::{BridgeError, Result};
use crate::point_cloud::PointCloud;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

pub const MAX_FRAME_ID_LEN: usize = 64;

pub type FrameId = ArrayString<MAX_FRAME_ID_LEN>;

/// Simulation time split into whole seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i32,
    pub nanosec: u32,
}

impl Stamp {
    pub fn from_millis(ms: u64) -> Self {
        Self {
            sec: (ms / 1000) as i32,
            nanosec: (ms % 1000) as u32 * 1_000_000,
        }
    }

    pub fn as_secs_f64(&self) -> f64 {
        f64::from(self.sec) + f64::from(self.nanosec) * 1e-9
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: FrameId,
}

impl Header {
    pub fn new(frame_id: &str) -> Result<Self> {
        let frame_id = FrameId::from(frame_id).map_err(|_| BridgeError::InvalidParameter {
            key: "frameName",
            value: alloc::string::ToString::to_string(frame_id),
        })?;

        Ok(Self {
            stamp: Stamp::default(),
            frame_id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    Reliable,
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Durability {
    Volatile,
    /// Late subscribers receive the last published message.
    TransientLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QosProfile {
    pub reliability: Reliability,
    pub durability: Durability,
    pub depth: usize,
}

impl QosProfile {
    /// Sensor data profile, upgraded to reliable delivery.
    pub const fn sensor_data_reliable() -> Self {
        Self {
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
            depth: 5,
        }
    }

    /// Keep-last(1), transient-local: used for calibration so that
    /// subscribers joining after startup still see it.
    pub const fn latched() -> Self {
        Self {
            reliability: Reliability::Reliable,
            durability: Durability::TransientLocal,
            depth: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: alloc::string::String,
    pub qos: QosProfile,
}

/// The three output streams of one range finder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSet {
    pub image: Topic,
    pub camera_info: Topic,
    pub point_cloud: Topic,
}

/// Publish side of the transport.
///
/// Every artifact handed to a sink is fully written; implementations may
/// copy or serialise it but must not hold on to the borrow.
pub trait ArtifactSink {
    fn publish_image(&mut self, image: &DepthImage) -> Result<()>;
    fn publish_camera_info(&mut self, info: &CameraInfo) -> Result<()>;
    fn publish_point_cloud(&mut self, cloud: &PointCloud) -> Result<()>;

    /// Number of consumers currently subscribed to the depth image stream.
    fn image_subscriber_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    DepthImage,
    CameraInfo,
    PointCloud,
}

/// Compact description of a published artifact, small enough to stream as
/// one JSON line per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub kind: ArtifactKind,
    pub stamp: Stamp,
    pub frame_id: FrameId,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    /// Point (or range) at the central pixel when it is finite. JSON has
    /// no encoding for non-finite floats.
    pub center: Option<[f32; 3]>,
    /// Smallest and largest finite range in the frame.
    pub finite_range: Option<(f32, f32)>,
}

impl FrameSummary {
    pub fn from_image(image: &DepthImage) -> Self {
        let center = image
            .pixel(image.width / 2, image.height / 2)
            .map(|range| [range, 0.0, 0.0])
            .filter(all_finite);

        Self {
            kind: ArtifactKind::DepthImage,
            stamp: image.header.stamp,
            frame_id: image.header.frame_id,
            width: image.width,
            height: image.height,
            bytes: image.data.len(),
            center,
            finite_range: finite_bounds(image.ranges()),
        }
    }

    pub fn from_camera_info(info: &CameraInfo) -> Self {
        Self {
            kind: ArtifactKind::CameraInfo,
            stamp: info.header.stamp,
            frame_id: info.header.frame_id,
            width: info.width,
            height: info.height,
            bytes: 0,
            center: None,
            finite_range: None,
        }
    }

    pub fn from_point_cloud(cloud: &PointCloud) -> Self {
        Self {
            kind: ArtifactKind::PointCloud,
            stamp: cloud.header.stamp,
            frame_id: cloud.header.frame_id,
            width: cloud.width,
            height: cloud.height,
            bytes: cloud.data.len(),
            center: cloud.point_at(cloud.width / 2, cloud.height / 2).filter(all_finite),
            finite_range: finite_bounds(cloud.points().map(|p| p[0])),
        }
    }
}

fn all_finite(point: &[f32; 3]) -> bool {
    point.iter().all(|v| v.is_finite())
}

fn finite_bounds(values: impl Iterator<Item = f32>) -> Option<(f32, f32)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
