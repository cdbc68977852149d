use super::Forecast;
use crate::core::time::Duration;
use crate::core::unit::{DegreeCelsius, WattsPerSquareMeter};

/// Single-slot forecast cache owned by the device loop. A failed refresh
/// keeps the last forecast around for diagnostics, but readers see nulls
/// until the next successful fetch, and in any case once the validity
/// window has passed.
pub struct WeatherCache {
    forecast: Option<Forecast>,
    validity: Duration,
    last_refresh_ok: bool,
}

impl WeatherCache {
    pub fn new(validity: Duration) -> Self {
        Self {
            forecast: None,
            validity,
            last_refresh_ok: false,
        }
    }

    pub fn store(&mut self, forecast: Forecast) {
        tracing::debug!("Weather forecast refreshed, {} hourly samples", forecast.hourly.len());
        self.forecast = Some(forecast);
        self.last_refresh_ok = true;
    }

    pub fn mark_unavailable(&mut self) {
        self.last_refresh_ok = false;
    }

    pub fn is_available(&self) -> bool {
        self.valid_forecast().is_some()
    }

    /// Last fetched forecast, stale or not.
    pub fn forecast(&self) -> Option<&Forecast> {
        self.forecast.as_ref()
    }

    pub fn current_outdoor_temp(&self) -> Option<DegreeCelsius> {
        self.valid_forecast()?.current_outdoor_temp()
    }

    pub fn current_solar(&self) -> Option<WattsPerSquareMeter> {
        self.valid_forecast()?.current_solar()
    }

    pub fn temps_for_next_hours(&self, hours: usize) -> Vec<DegreeCelsius> {
        self.valid_forecast()
            .map(|f| f.temps_for_next_hours(hours))
            .unwrap_or_default()
    }

    pub fn solar_for_next_hours(&self, hours: usize) -> Vec<WattsPerSquareMeter> {
        self.valid_forecast()
            .map(|f| f.solar_for_next_hours(hours))
            .unwrap_or_default()
    }

    pub fn average_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        self.valid_forecast()?.average_temp(hours)
    }

    pub fn min_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        self.valid_forecast()?.min_temp(hours)
    }

    pub fn max_temp(&self, hours: usize) -> Option<DegreeCelsius> {
        self.valid_forecast()?.max_temp(hours)
    }

    fn valid_forecast(&self) -> Option<&Forecast> {
        if !self.last_refresh_ok {
            return None;
        }

        let forecast = self.forecast.as_ref()?;
        if forecast.fetched_at.elapsed() <= self.validity {
            Some(forecast)
        } else {
            None
        }
    }
}
