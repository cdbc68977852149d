mod tracker;

pub use tracker::{SensorTracker, TrackerConfig};

use crate::core::time::DateTime;
use crate::core::unit::{DegreeCelsius, Percent};

/// Latest observation of the authoritative room sensor. Single slot, never
/// persisted.
#[derive(Debug, Clone, Copy)]
pub struct SensorReading {
    pub room_temp: DegreeCelsius,
    pub humidity: Percent,
    pub observed_at: DateTime,
}
