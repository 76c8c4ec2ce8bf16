//! # Range Finder Bridge
//!
//! Adapts a simulated range finder into three synchronized output streams:
//! a 32-bit float depth image, the sensor's pinhole calibration, and a point
//! cloud back-projected from the depth image.
//!
//! ## Features
//!
//! - **Demand-driven sampling**: the device is enabled only while the depth
//!   image has consumers, with enable/disable issued on transitions only
//! - **Pinhole back-projection**: one point per pixel, organised like the image
//! - **Consistent artifacts**: image and cloud are built from the same range
//!   buffer within a tick, or not at all
//! - **Capability seams**: the device and the transport are traits, so the
//!   adapter runs against in-memory stand-ins
//!
//! ## Quick Start
//!
//! ```rust
//! use rangefinder_bridge::{RangeFinderAdapter, RangeFinderConfig, StepOutcome};
//! use rangefinder_bridge::sensor::{Scene, SyntheticRangeFinder};
//! use rangefinder_bridge::transport::ArtifactSink;
//! use rangefinder_bridge::{CameraInfo, DepthImage, PointCloud};
//!
//! struct CountingSink {
//!     frames: usize,
//! }
//!
//! impl ArtifactSink for CountingSink {
//!     fn publish_image(&mut self, _: &DepthImage) -> rangefinder_bridge::Result<()> {
//!         self.frames += 1;
//!         Ok(())
//!     }
//!     fn publish_camera_info(&mut self, _: &CameraInfo) -> rangefinder_bridge::Result<()> {
//!         Ok(())
//!     }
//!     fn publish_point_cloud(&mut self, _: &PointCloud) -> rangefinder_bridge::Result<()> {
//!         Ok(())
//!     }
//!     fn image_subscriber_count(&self) -> usize {
//!         0
//!     }
//! }
//!
//! let sensor = SyntheticRangeFinder::new(64, 48, 1.0, Scene::Plane { distance: 2.0 });
//! let mut config = RangeFinderConfig::new("range_finder");
//! config.always_on = true;
//!
//! let mut adapter =
//!     RangeFinderAdapter::init(Some(sensor), CountingSink { frames: 0 }, config, 32, 0).unwrap();
//!
//! for tick in 1..=4u64 {
//!     adapter.sensor_mut().advance(32);
//!     let outcome = adapter.step(tick * 32);
//!     assert_eq!(outcome, StepOutcome::Published);
//! }
//! assert_eq!(adapter.sink().frames, 4);
//! ```
//!
//! ## Architecture
//!
//! - [`calibration`] - Calibration derived from width, height and field of view
//! - [`depth_image`] - Depth image artifact and encoder
//! - [`point_cloud`] - Point cloud artifact and back-projection
//! - [`activation`] - Edge-triggered sensor enable/disable
//! - [`adapter`] - Per-tick orchestration
//! - [`sensor`] / [`transport`] - Device and transport capability traits
//! - [`config`] / [`timing`] - Parameters and publish-period gating

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

extern crate alloc;

pub mod activation;
pub mod adapter;
pub mod calibration;
pub mod config;
pub mod depth_image;
pub mod error;
pub mod point_cloud;
pub mod sensor;
pub mod timing;
pub mod transport;

// Re-export main public types for convenience
pub use adapter::{AdapterStats, RangeFinderAdapter, StepOutcome};
pub use calibration::{derive_calibration, CalibrationRecord, CameraInfo};
pub use config::RangeFinderConfig;
pub use depth_image::DepthImage;
pub use error::{BridgeError, Result};
pub use point_cloud::PointCloud;
