mod cache;
mod client;

pub use cache::WeatherCache;
pub use client::OpenMeteoClient;

use serde::Deserialize;

use crate::core::time::DateTime;
use crate::core::unit::{DegreeCelsius, Percent, WattsPerSquareMeter};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// One hour of the outdoor forecast. Every observable is optional, the
/// provider may leave gaps.
#[derive(Debug, Clone)]
pub struct HourlyForecast {
    pub timestamp: DateTime,
    pub outdoor_temp: Option<DegreeCelsius>,
    pub solar_radiation: Option<WattsPerSquareMeter>,
    pub direct_radiation: Option<WattsPerSquareMeter>,
    pub cloud_cover: Option<Percent>,
    pub wind_speed: Option<f64>,
}

/// Immutable fetch result, replaced as a whole on every successful refresh.
#[derive(Debug, Clone)]
pub struct Forecast {
    pub fetched_at: DateTime,
    pub hourly: Vec<HourlyForecast>,
}

impl Forecast {
    pub const HORIZON_HOURS: usize = 48;

    pub fn new(fetched_at: DateTime, mut hourly: Vec<HourlyForecast>) -> Self {
        hourly.truncate(Self::HORIZON_HOURS);
        Self { fetched_at, hourly }
    }

    pub fn current_outdoor_temp(&self) -> Option<DegreeCelsius> {
        self.hourly.first()?.outdoor_temp
    }

    pub fn current_solar(&self) -> Option<WattsPerSquareMeter> {
        self.hourly.first()?.solar_radiation
    }

    /// Known temperatures of the next `hours` samples, gaps skipped.
    pub fn temps_for_next_hours(&self, hours: usize) -> Vec<DegreeCelsius> {
        self.hourly.iter().take(hours).filter_map(|h| h.outdoor_temp).collect()
    }

    pub fn solar_for_next_hours(&self, hours: usize) -> Vec<WattsPerSquareMeter> {
        self.hourly
            .iter()
            .take(hours)
            .filter_map(|h| h.solar_radiation)
            .collect()
    }

    pub fn average_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        let temps = self.temps_for_next_hours(hours);
        if temps.is_empty() {
            return None;
        }

        let sum: f64 = temps.iter().map(f64::from).sum();
        Some(DegreeCelsius(sum / temps.len() as f64))
    }

    pub fn min_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        self.temps_for_next_hours(hours)
            .into_iter()
            .min_by(|a, b| a.partial_cmp(b).expect("forecast temps are never NaN"))
    }

    pub fn max_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        self.temps_for_next_hours(hours)
            .into_iter()
            .max_by(|a, b| a.partial_cmp(b).expect("forecast temps are never NaN"))
    }
}

#[cfg(test)]
pub(crate) fn forecast_of_temps(temps: &[f64]) -> Forecast {
    use crate::t;

    let now = DateTime::now();
    let hourly = temps
        .iter()
        .enumerate()
        .map(|(i, temp)| HourlyForecast {
            timestamp: now + crate::core::time::Duration::hours(i as i64),
            outdoor_temp: Some(DegreeCelsius(*temp)),
            solar_radiation: None,
            direct_radiation: None,
            cloud_cover: None,
            wind_speed: None,
        })
        .collect();

    Forecast::new(t!(now), hourly)
}
