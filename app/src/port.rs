use crate::adapter::melcloud::{DeviceSnapshot, DeviceUpdate};
use crate::adapter::metrics::MetricPoint;
use crate::sensor::SensorReading;

/// Cloud transport of the air conditioner. The core only depends on this
/// contract; the vendor adapter lives in `adapter::melcloud`.
pub trait AcClient {
    async fn fetch_state(&self) -> anyhow::Result<DeviceSnapshot>;
    async fn send(&self, update: DeviceUpdate) -> anyhow::Result<()>;
}

/// External room sensor. A second sensor brand is a new adapter with the
/// same shape.
pub trait RoomSensorClient {
    async fn fetch_reading(&self) -> anyhow::Result<SensorReading>;
}

/// Optional time-series logging target.
pub trait TimeSeriesSink {
    async fn write_point(&self, point: MetricPoint) -> anyhow::Result<()>;
}
