use config::{Config, ConfigError, File};
use infrastructure::MonitoringConfig;
use serde::Deserialize;

use crate::adapter::melcloud::MelcloudConfig;
use crate::adapter::metrics::MetricsConfig;
use crate::adapter::room_sensor::RoomSensorConfig;
use crate::control::{OrchestratorConfig, RunnerConfig};
use crate::core::time::Duration;
use crate::core::unit::DegreeCelsius;
use crate::sensor::TrackerConfig;
use crate::weather::Location;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub monitoring: MonitoringConfig,
    pub device: DeviceSettings,
    pub melcloud: MelcloudConfig,
    pub room_sensor: RoomSensorConfig,
    pub weather: WeatherSettings,
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub algorithm: AlgorithmSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder().add_source(File::with_name("config.toml")).build()?;

        s.try_deserialize()
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            device_id: self.device.id.clone(),
            ac_refresh: Duration::seconds(self.device.refresh_interval_secs as i64),
            sensor_poll: Duration::seconds(self.room_sensor.poll_interval_secs as i64),
            weather_refresh: Duration::minutes(self.weather.refresh_minutes as i64),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        self.algorithm
            .apply_to(OrchestratorConfig {
                base_target: DegreeCelsius(self.device.target_temperature),
                weather_validity: Duration::minutes(self.weather.validity_minutes as i64),
                ..OrchestratorConfig::default()
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeviceSettings {
    pub id: String,
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherSettings {
    pub location: Location,
    #[serde(default = "default_weather_refresh_minutes")]
    pub refresh_minutes: u64,
    #[serde(default = "default_weather_validity_minutes")]
    pub validity_minutes: u64,
}

/// Overrides for the documented algorithm defaults. Everything is optional;
/// an absent key keeps the built-in value.
#[derive(Debug, Default, Deserialize)]
pub struct AlgorithmSettings {
    pub deadband: Option<f64>,
    pub hysteresis: Option<f64>,
    pub min_on_secs: Option<i64>,
    pub min_off_secs: Option<i64>,
    pub min_mode_switch_secs: Option<i64>,
    pub min_action_interval_secs: Option<i64>,
    pub outdoor_reset_gain: Option<f64>,
    pub forecast_gain: Option<f64>,
    pub solar_gain: Option<f64>,
    pub error_gain: Option<f64>,
    pub ac_min_setpoint: Option<f64>,
    pub ac_max_setpoint: Option<f64>,
}

impl AlgorithmSettings {
    fn apply_to(&self, mut config: OrchestratorConfig) -> OrchestratorConfig {
        let calculator = &mut config.calculator;
        override_field(&mut calculator.outdoor_reset_gain, self.outdoor_reset_gain);
        override_field(&mut calculator.forecast_gain, self.forecast_gain);
        override_field(&mut calculator.solar_gain, self.solar_gain);
        override_field(&mut calculator.error_gain, self.error_gain);

        let machine = &mut config.state_machine;
        override_field(&mut machine.deadband, self.deadband);
        override_field(&mut machine.hysteresis, self.hysteresis);
        override_field(&mut machine.min_on, self.min_on_secs.map(Duration::seconds));
        override_field(&mut machine.min_off, self.min_off_secs.map(Duration::seconds));
        override_field(
            &mut machine.min_mode_switch,
            self.min_mode_switch_secs.map(Duration::seconds),
        );

        override_field(
            &mut config.executor.min_action_interval,
            self.min_action_interval_secs.map(Duration::seconds),
        );

        let tracker: &mut TrackerConfig = &mut config.tracker;
        override_field(
            &mut tracker.ac_min_setpoint,
            self.ac_min_setpoint.map(DegreeCelsius),
        );
        override_field(
            &mut tracker.ac_max_setpoint,
            self.ac_max_setpoint.map(DegreeCelsius),
        );

        config
    }
}

fn override_field<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn default_target_temperature() -> f64 {
    23.0
}

fn default_refresh_interval_secs() -> u64 {
    90
}

fn default_weather_refresh_minutes() -> u64 {
    60
}

fn default_weather_validity_minutes() -> u64 {
    120
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::t;

    #[test]
    fn test_algorithm_overrides_apply() {
        let settings = AlgorithmSettings {
            hysteresis: Some(1.5),
            min_on_secs: Some(120),
            error_gain: Some(0.5),
            ..Default::default()
        };

        let config = settings.apply_to(OrchestratorConfig::default());

        assert_eq!(config.state_machine.hysteresis, 1.5);
        assert_eq!(config.state_machine.min_on, t!(120 seconds));
        assert_eq!(config.calculator.error_gain, 0.5);
        //untouched values keep their documented defaults
        assert_eq!(config.state_machine.deadband, 4.0);
        assert_eq!(config.executor.min_action_interval, t!(60 seconds));
    }
}
