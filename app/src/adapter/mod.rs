pub mod melcloud;
pub mod metrics;
pub mod room_sensor;
