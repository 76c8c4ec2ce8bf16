use crate::activation::{ActivationController, ActivationState};
use crate::calibration::{CalibrationRecord, CameraInfo, Intrinsics};
use crate::config::RangeFinderConfig;
use crate::depth_image::DepthImage;
use crate::error::{BridgeError, Result};
use crate::point_cloud::PointCloud;
use crate::sensor::RangeSensor;
use crate::timing::{synced_period_ms, PublishGate};
use crate::transport::{ArtifactSink, Header, Stamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What a single call to [`RangeFinderAdapter::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The publish period has not elapsed yet.
    Gated,
    /// Sensor disabled, nothing to emit.
    Idle,
    /// Depth image and point cloud were both handed to the sink.
    Published,
    /// Sampling, but the device had no range buffer this tick.
    Unavailable,
    /// Sampling, but the range buffer did not match the sensor geometry.
    Malformed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct AdapterStats {
    pub ticks: u64,
    pub ticks_gated: u64,
    pub frames_published: u64,
    pub ticks_unavailable: u64,
    pub ticks_malformed: u64,
    pub publish_errors: u64,
}

/// Drives one range finder: activation, per-tick projection and
/// publication of the three artifacts.
///
/// The depth image and point cloud are owned buffers rewritten in place.
/// After a tick returning [`StepOutcome::Published`] both describe the same
/// range buffer; any other outcome leaves them as they were.
pub struct RangeFinderAdapter<S: RangeSensor, T: ArtifactSink> {
    sensor: S,
    sink: T,
    config: RangeFinderConfig,

    calibration: CalibrationRecord,
    intrinsics: Intrinsics,
    camera_info: CameraInfo,

    // Preallocated output artifacts
    image: DepthImage,
    cloud: PointCloud,

    activation: ActivationController,
    gate: PublishGate,
    stats: AdapterStats,
}

impl<S: RangeSensor, T: ArtifactSink> RangeFinderAdapter<S, T> {
    /// Bind the adapter to a sensor handle and publish the calibration.
    ///
    /// `sensor` is `None` when the host has no device with the configured
    /// name. That, a degenerate field of view or an empty image abort
    /// initialisation.
    pub fn init(
        sensor: Option<S>,
        mut sink: T,
        config: RangeFinderConfig,
        basic_timestep_ms: u32,
        now_ms: u64,
    ) -> Result<Self> {
        config.validate()?;
        let mut sensor = sensor.ok_or_else(|| BridgeError::SensorUnavailable {
            name: config.name.clone(),
        })?;

        let width = sensor.width();
        let height = sensor.height();
        let calibration = CalibrationRecord::derive(width, height, sensor.field_of_view())?;

        let header = Header::new(config.frame_name())?;
        let image = DepthImage::new(width, height, header.clone());
        let cloud = PointCloud::new(width, height, header.clone());

        let mut camera_info = calibration.to_camera_info(header);
        camera_info.header.stamp = Stamp::from_millis(now_ms);
        sink.publish_camera_info(&camera_info)?;

        let publish_timestep_ms = config.publish_timestep_ms(basic_timestep_ms);
        let sampling_period_ms = synced_period_ms(publish_timestep_ms, basic_timestep_ms);
        let activation = ActivationController::initialize(&mut sensor, config.always_on, sampling_period_ms);

        let topics = config.topics();
        info!(
            device = %config.name,
            image = %topics.image.name,
            camera_info = %topics.camera_info.name,
            point_cloud = %topics.point_cloud.name,
            width,
            height,
            always_on = config.always_on,
            sampling_period_ms,
            "range finder adapter ready"
        );

        Ok(Self {
            sensor,
            sink,
            config,
            intrinsics: calibration.intrinsics(),
            calibration,
            camera_info,
            image,
            cloud,
            activation,
            gate: PublishGate::new(publish_timestep_ms),
            stats: AdapterStats::default(),
        })
    }

    /// Advance one simulation tick.
    ///
    /// Artifacts are emitted when the sensor was sampling at the start of the
    /// tick; demand is re-evaluated afterwards, so a newly enabled sensor
    /// first emits on a later tick.
    pub fn step(&mut self, now_ms: u64) -> StepOutcome {
        if !self.gate.ready(now_ms) {
            self.stats.ticks_gated += 1;
            return StepOutcome::Gated;
        }
        self.stats.ticks += 1;

        let outcome = if self.activation.is_active() {
            self.emit(Stamp::from_millis(now_ms))
        } else {
            StepOutcome::Idle
        };

        if !self.activation.always_on() {
            let consumers = self.sink.image_subscriber_count();
            self.activation.tick(&mut self.sensor, consumers);
        }

        outcome
    }

    fn emit(&mut self, stamp: Stamp) -> StepOutcome {
        let Some(ranges) = self.sensor.range_image() else {
            debug!(device = %self.config.name, "no range image this tick");
            self.stats.ticks_unavailable += 1;
            return StepOutcome::Unavailable;
        };

        // Both artifacts come from the same buffer; check it once so neither
        // is written unless both can be.
        let expected = self.image.pixel_count();
        if ranges.len() != expected {
            warn!(
                device = %self.config.name,
                expected,
                actual = ranges.len(),
                "range image does not match sensor geometry, skipping tick"
            );
            self.stats.ticks_malformed += 1;
            return StepOutcome::Malformed;
        }

        let written = self
            .image
            .encode(ranges)
            .and_then(|()| self.cloud.project(ranges, &self.intrinsics));
        if let Err(e) = written {
            warn!(device = %self.config.name, error = %e, "failed to build range artifacts");
            self.stats.ticks_malformed += 1;
            return StepOutcome::Malformed;
        }

        self.image.header.stamp = stamp;
        self.cloud.header.stamp = stamp;

        if let Err(e) = self.sink.publish_image(&self.image) {
            warn!(device = %self.config.name, error = %e, "depth image publish failed");
            self.stats.publish_errors += 1;
        }
        if let Err(e) = self.sink.publish_point_cloud(&self.cloud) {
            warn!(device = %self.config.name, error = %e, "point cloud publish failed");
            self.stats.publish_errors += 1;
        }

        self.stats.frames_published += 1;
        StepOutcome::Published
    }

    pub fn is_sampling(&self) -> bool {
        self.activation.is_active()
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation.state()
    }

    pub fn activation(&self) -> &ActivationController {
        &self.activation
    }

    pub fn calibration(&self) -> &CalibrationRecord {
        &self.calibration
    }

    pub fn camera_info(&self) -> &CameraInfo {
        &self.camera_info
    }

    /// Last emitted depth image.
    pub fn depth_image(&self) -> &DepthImage {
        &self.image
    }

    /// Last emitted point cloud.
    pub fn point_cloud(&self) -> &PointCloud {
        &self.cloud
    }

    pub fn config(&self) -> &RangeFinderConfig {
        &self.config
    }

    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut T {
        &mut self.sink
    }
}
