use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor is not responding")]
    Disconnected,
    #[error("sensor returned invalid data")]
    InvalidData,
}

/// Source of the scalar a node reports every sampling tick.
#[async_trait]
pub trait Sensor: Send + Sync + 'static {
    fn name(&self) -> &str;
    async fn read(&self) -> Result<i16, SensorError>;
}

/// Degrees Celsius from a raw MPU-6050 temperature register value.
///
/// Integer arithmetic, truncating, matching what the node firmware reports.
pub fn temperature_from_raw(raw: i16) -> i16 {
    raw / 340 + 37
}

/// MPU-6050 stand-in producing room-temperature register values.
pub struct SimulatedMpu6050 {
    connected: AtomicBool,
}

impl SimulatedMpu6050 {
    // about 21 to 29 degrees
    const RAW_RANGE: std::ops::RangeInclusive<i16> = -5440..=-2720;

    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Default for SimulatedMpu6050 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sensor for SimulatedMpu6050 {
    fn name(&self) -> &str {
        "mpu6050-sim"
    }

    async fn read(&self) -> Result<i16, SensorError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SensorError::Disconnected);
        }

        let raw: i16 = rand::rng().random_range(Self::RAW_RANGE);
        Ok(temperature_from_raw(raw))
    }
}
