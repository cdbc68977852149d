use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use super::{DeviceSnapshot, DeviceUpdate, OperationMode};
use crate::core::unit::DegreeCelsius;
use crate::port::AcClient;

#[derive(Debug, Clone, Deserialize)]
pub struct MelcloudConfig {
    pub base_url: String,
    pub context_key: String,
    pub device_id: i64,
    pub building_id: i64,
}

#[derive(Clone)]
pub struct MelcloudClient {
    client: ClientWithMiddleware,
    config: MelcloudConfig,
}

impl MelcloudClient {
    pub fn new(config: MelcloudConfig) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(None).with_timeout(15).new_tracing_client()?;

        Ok(Self { client, config })
    }
}

impl AcClient for MelcloudClient {
    async fn fetch_state(&self) -> anyhow::Result<DeviceSnapshot> {
        let response = self
            .client
            .get(format!("{}/Device/Get", self.config.base_url))
            .header("X-MitsContextKey", &self.config.context_key)
            .query(&[
                ("id", self.config.device_id.to_string()),
                ("buildingID", self.config.building_id.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let payload = response
            .json::<DeviceStatePayload>()
            .await
            .context("Error decoding AC device state")?;

        Ok(payload.into_snapshot())
    }

    async fn send(&self, update: DeviceUpdate) -> anyhow::Result<()> {
        let body = CommandPayload {
            device_id: self.config.device_id,
            has_pending_command: true,
            update,
        };

        tracing::debug!("Sending AC command: {:?}", serde_json::to_string(&body)?);

        self.client
            .post(format!("{}/Device/SetAta", self.config.base_url))
            .header("X-MitsContextKey", &self.config.context_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeviceStatePayload {
    power: Option<bool>,
    operation_mode: Option<i64>,
    room_temperature: Option<f64>,
    set_temperature: Option<f64>,
    #[serde(default)]
    prohibit: bool,
    fan_speed: Option<i64>,
    vane_vertical: Option<i64>,
    vane_horizontal: Option<i64>,
}

impl DeviceStatePayload {
    fn into_snapshot(self) -> DeviceSnapshot {
        let operation_mode = self.operation_mode.and_then(|raw| {
            let mode = OperationMode::from_raw(raw);
            if mode.is_none() {
                tracing::warn!("AC reported unknown operation mode {}", raw);
            }
            mode
        });

        DeviceSnapshot {
            power: self.power,
            operation_mode,
            ac_sensor_temp: self.room_temperature.map(DegreeCelsius),
            ac_set_temp: self.set_temperature.map(DegreeCelsius),
            user_prohibit: self.prohibit,
            fan_speed: self.fan_speed,
            vane_vertical: self.vane_vertical,
            vane_horizontal: self.vane_horizontal,
        }
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct CommandPayload {
    device_id: i64,
    has_pending_command: bool,
    #[serde(flatten)]
    update: DeviceUpdate,
}
