use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use crate::core::unit::{DegreeCelsius, Percent};
use crate::port::RoomSensorClient;
use crate::sensor::SensorReading;
use crate::t;

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSensorConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Seconds between polls; the runner never goes below one second.
    pub poll_interval_secs: u64,
}

/// Cloud client of the authoritative room sensor.
pub struct ExternalRoomSensor {
    client: ClientWithMiddleware,
    base_url: String,
}

impl ExternalRoomSensor {
    pub fn new(config: &RoomSensorConfig) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(config.token.clone())
            .with_timeout(10)
            .new_tracing_client()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

impl RoomSensorClient for ExternalRoomSensor {
    async fn fetch_reading(&self) -> anyhow::Result<SensorReading> {
        let response = self
            .client
            .get(format!("{}/api/v1/current", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let payload = response
            .json::<SensorPayload>()
            .await
            .context("Error decoding room sensor reading")?;

        Ok(SensorReading {
            room_temp: DegreeCelsius(payload.temperature),
            humidity: Percent(payload.humidity),
            observed_at: t!(now),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SensorPayload {
    temperature: f64,
    humidity: f64,
}
