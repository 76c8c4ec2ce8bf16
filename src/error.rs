use thiserror::Error;

pub type Result<T> = core::result::Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// The host could not hand over a sensor handle for the configured device.
    #[error("range finder '{name}' is not available on this robot")]
    SensorUnavailable { name: alloc::string::String },

    #[error("field of view {0} rad is outside (0, pi)")]
    DegenerateFieldOfView(f64),

    #[error("sensor geometry {width}x{height} has no pixels")]
    EmptyGeometry { width: u32, height: u32 },

    /// Raw range buffer does not cover `width * height` pixels.
    #[error("range buffer holds {actual} values, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("invalid value '{value}' for parameter '{key}'")]
    InvalidParameter {
        key: &'static str,
        value: alloc::string::String,
    },

    #[error("configuration error: {0}")]
    Config(alloc::string::String),

    #[error("transport error: {0}")]
    Transport(alloc::string::String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Config(alloc::string::ToString::to_string(&e))
    }
}
