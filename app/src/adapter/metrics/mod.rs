mod repository;

pub use repository::{MetricsConfig, VictoriaSink};

use crate::control::{SeasonMode, TickReport};
use crate::core::time::DateTime;
use crate::t;

/// One control tick flattened into time-series fields, tagged with the
/// device and its current control situation.
#[derive(Debug, Clone)]
pub struct MetricPoint {
    pub device_id: String,
    pub hvac_state: String,
    pub season: SeasonMode,
    pub timestamp: DateTime,
    pub fields: Vec<(&'static str, f64)>,
}

impl MetricPoint {
    pub fn from_report(device_id: &str, report: &TickReport) -> Self {
        let mut fields: Vec<(&'static str, f64)> = Vec::new();

        if let Some(indoor) = report.display_room_temp {
            fields.push(("indoor_temp", indoor.0));
        }
        if let Some(outdoor) = report.outdoor_temp {
            fields.push(("outdoor_temp", outdoor.0));
        }
        if let Some(setpoint) = report.compensated_setpoint {
            fields.push(("ac_setpoint", setpoint.0));
        }
        if let Some(solar) = report.solar {
            fields.push(("solar_radiation", solar.0));
        }
        fields.push(("user_target", report.user_target.0));
        fields.push(("predicted_target", report.prediction.predicted_room_target.0));
        fields.push(("power_state", if report.power { 1.0 } else { 0.0 }));

        Self {
            device_id: device_id.to_string(),
            hvac_state: report.state.to_string(),
            season: report.season,
            timestamp: t!(now),
            fields,
        }
    }

    /// Prometheus import format, one line per field.
    pub fn to_lines(&self) -> String {
        let mut body = String::new();

        for (field, value) in &self.fields {
            body.push_str(&format!(
                "climate_{}{{device=\"{}\",hvac_state=\"{}\",season=\"{}\"}} {} {}\n",
                field, self.device_id, self.hvac_state, self.season, value, self.timestamp.millis()
            ));
        }

        body
    }
}
