use serde::{Deserialize, Serialize};

/// Handle on a simulated range finder device.
///
/// The device owns its range buffer; [`RangeSensor::range_image`] lends it
/// for the current tick only.
pub trait RangeSensor {
    fn enable(&mut self, sampling_period_ms: u32);
    fn disable(&mut self);
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Horizontal field of view in radians.
    fn field_of_view(&self) -> f64;
    /// Latest row-major range buffer, or `None` while no frame is available.
    fn range_image(&self) -> Option<&[f32]>;
}

/// Scene rendered by [`SyntheticRangeFinder`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scene {
    /// Every pixel reports the same distance.
    Plane { distance: f32 },
    /// Distance grows linearly from the left column to the right one.
    Ramp { near: f32, far: f32 },
    /// A plane that moves back and forth along the optical axis.
    Oscillating { mean: f32, amplitude: f32, period_ms: u32 },
}

/// In-memory range finder: renders a [`Scene`] at its sampling period while
/// enabled. Readings beyond `max_range` are reported as `+inf`.
#[derive(Debug, Clone)]
pub struct SyntheticRangeFinder {
    width: u32,
    height: u32,
    fov: f64,
    max_range: f32,
    scene: Scene,
    sampling_period_ms: Option<u32>,
    elapsed_ms: u64,
    since_sample_ms: u64,
    buffer: alloc::vec::Vec<f32>,
    has_frame: bool,
}

impl SyntheticRangeFinder {
    pub fn new(width: u32, height: u32, fov: f64, scene: Scene) -> Self {
        Self {
            width,
            height,
            fov,
            max_range: f32::INFINITY,
            scene,
            sampling_period_ms: None,
            elapsed_ms: 0,
            since_sample_ms: 0,
            buffer: alloc::vec![0.0; width as usize * height as usize],
            has_frame: false,
        }
    }

    pub fn with_max_range(mut self, max_range: f32) -> Self {
        self.max_range = max_range;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.sampling_period_ms.is_some()
    }

    pub fn sampling_period_ms(&self) -> Option<u32> {
        self.sampling_period_ms
    }

    /// Advance the device clock, sampling the scene whenever a full period
    /// has elapsed since the previous sample.
    pub fn advance(&mut self, dt_ms: u32) {
        self.elapsed_ms += u64::from(dt_ms);

        let Some(period) = self.sampling_period_ms else {
            return;
        };

        self.since_sample_ms += u64::from(dt_ms);
        if self.since_sample_ms >= u64::from(period) {
            self.since_sample_ms = 0;
            self.render();
        }
    }

    fn render(&mut self) {
        let width = self.width as usize;
        let elapsed_ms = self.elapsed_ms;
        let scene = self.scene;
        let max_range = self.max_range;

        for (index, range) in self.buffer.iter_mut().enumerate() {
            let column = index % width.max(1);
            let distance = match scene {
                Scene::Plane { distance } => distance,
                Scene::Ramp { near, far } => {
                    let t = if width > 1 { column as f32 / (width - 1) as f32 } else { 0.0 };
                    near + (far - near) * t
                }
                Scene::Oscillating { mean, amplitude, period_ms } => {
                    let phase = (elapsed_ms % u64::from(period_ms.max(1))) as f32
                        / period_ms.max(1) as f32;
                    mean + amplitude * (phase * core::f32::consts::TAU).sin()
                }
            };
            *range = if distance > max_range { f32::INFINITY } else { distance };
        }

        self.has_frame = true;
    }
}

impl RangeSensor for SyntheticRangeFinder {
    fn enable(&mut self, sampling_period_ms: u32) {
        self.sampling_period_ms = Some(sampling_period_ms.max(1));
        self.since_sample_ms = 0;
    }

    fn disable(&mut self) {
        self.sampling_period_ms = None;
        self.has_frame = false;
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn field_of_view(&self) -> f64 {
        self.fov
    }

    fn range_image(&self) -> Option<&[f32]> {
        self.has_frame.then_some(self.buffer.as_slice())
    }
}
