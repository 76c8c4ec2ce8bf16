use crate::error::{BridgeError, Result};
use crate::transport::{QosProfile, Topic, TopicSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-device adapter parameters.
///
/// Accepts the same keys the simulation host passes to device plugins:
/// `name`, `topicName`, `frameName`, `alwaysOn` and `updateRate`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RangeFinderConfig {
    pub name: String,
    pub topic_name: Option<String>,
    pub frame_name: Option<String>,
    pub always_on: bool,
    /// Publish rate in Hz. Unset publishes on every basic timestep.
    pub update_rate: Option<f64>,
}

impl RangeFinderConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_parameters(parameters: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();

        for (key, value) in parameters {
            match key.as_str() {
                "name" => config.name = value.clone(),
                "topicName" => config.topic_name = Some(value.clone()),
                "frameName" => config.frame_name = Some(value.clone()),
                "alwaysOn" => config.always_on = parse_bool("alwaysOn", value)?,
                "updateRate" => {
                    let rate = value.trim().parse::<f64>().map_err(|_| BridgeError::InvalidParameter {
                        key: "updateRate",
                        value: value.clone(),
                    })?;
                    config.update_rate = Some(rate);
                }
                // Parameters for other plugins share the same map.
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(BridgeError::Config("range finder name is required".to_string()));
        }

        if let Some(rate) = self.update_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(BridgeError::InvalidParameter {
                    key: "updateRate",
                    value: rate.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn topic_name(&self) -> String {
        match &self.topic_name {
            Some(topic) => topic.clone(),
            None => alloc::format!("/{}", self.name),
        }
    }

    pub fn frame_name(&self) -> &str {
        self.frame_name.as_deref().unwrap_or(&self.name)
    }

    pub fn publish_timestep_ms(&self, basic_timestep_ms: u32) -> f64 {
        match self.update_rate {
            Some(rate) => 1000.0 / rate,
            None => f64::from(basic_timestep_ms),
        }
    }

    pub fn topics(&self) -> TopicSet {
        let base = self.topic_name();
        TopicSet {
            image: Topic {
                name: base.clone(),
                qos: QosProfile::sensor_data_reliable(),
            },
            camera_info: Topic {
                name: alloc::format!("{base}/camera_info"),
                qos: QosProfile::latched(),
            },
            point_cloud: Topic {
                name: alloc::format!("{base}/point_cloud"),
                qos: QosProfile::sensor_data_reliable(),
            },
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(BridgeError::InvalidParameter {
            key,
            value: value.to_string(),
        }),
    }
}
