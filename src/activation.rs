use crate::sensor::RangeSensor;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    Idle,
    Sampling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivationStats {
    pub enable_commands: u32,
    pub disable_commands: u32,
}

/// Decides whether the range finder should be sampling.
///
/// Commands reach the sensor only on a state change: a steady demand, high
/// or low, issues nothing. With `always_on` the sensor is enabled once at
/// initialisation and never touched again.
#[derive(Debug)]
pub struct ActivationController {
    always_on: bool,
    state: ActivationState,
    sampling_period_ms: u32,
    stats: ActivationStats,
}

impl ActivationController {
    pub fn initialize<S: RangeSensor>(sensor: &mut S, always_on: bool, sampling_period_ms: u32) -> Self {
        let mut controller = Self {
            always_on,
            state: ActivationState::Idle,
            sampling_period_ms,
            stats: ActivationStats::default(),
        };

        if always_on {
            controller.enable(sensor);
        }

        controller
    }

    /// Re-evaluate demand. Returns whether the sensor is sampling afterwards.
    pub fn tick<S: RangeSensor>(&mut self, sensor: &mut S, consumer_count: usize) -> bool {
        if self.always_on {
            return true;
        }

        let should_sample = consumer_count > 0;
        if should_sample != self.is_active() {
            if should_sample {
                self.enable(sensor);
            } else {
                self.disable(sensor);
            }
            info!(consumer_count, state = ?self.state, "range finder activation changed");
        }

        self.is_active()
    }

    fn enable<S: RangeSensor>(&mut self, sensor: &mut S) {
        sensor.enable(self.sampling_period_ms);
        self.state = ActivationState::Sampling;
        self.stats.enable_commands = self.stats.enable_commands.saturating_add(1);
    }

    fn disable<S: RangeSensor>(&mut self, sensor: &mut S) {
        sensor.disable();
        self.state = ActivationState::Idle;
        self.stats.disable_commands = self.stats.disable_commands.saturating_add(1);
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Sampling
    }

    pub fn always_on(&self) -> bool {
        self.always_on
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn sampling_period_ms(&self) -> u32 {
        self.sampling_period_ms
    }

    pub fn stats(&self) -> &ActivationStats {
        &self.stats
    }
}
