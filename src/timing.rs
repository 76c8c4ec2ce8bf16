/// Gates ticks down to the configured publish period.
///
/// The host ticks at its basic timestep; a tick passes the gate only when at
/// least one publish timestep has elapsed since the last tick that passed.
#[derive(Debug, Clone)]
pub struct PublishGate {
    publish_timestep_ms: f64,
    last_update_ms: Option<u64>,
}

impl PublishGate {
    pub fn new(publish_timestep_ms: f64) -> Self {
        Self {
            publish_timestep_ms,
            last_update_ms: None,
        }
    }

    pub fn ready(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_update_ms {
            let elapsed = now_ms.saturating_sub(last) as f64;
            if elapsed < self.publish_timestep_ms {
                return false;
            }
        }

        self.last_update_ms = Some(now_ms);
        true
    }

    pub fn publish_timestep_ms(&self) -> f64 {
        self.publish_timestep_ms
    }
}

/// Sampling period handed to the device: the publish timestep rounded up to
/// a whole number of basic timesteps, never less than one.
pub fn synced_period_ms(publish_timestep_ms: f64, basic_timestep_ms: u32) -> u32 {
    let basic = basic_timestep_ms.max(1);
    let steps = (publish_timestep_ms / f64::from(basic)).ceil().max(1.0);
    (steps as u32).saturating_mul(basic)
}
