use super::{ControlContext, SeasonMode};
use crate::core::unit::DegreeCelsius;

/// Tuning constants of the predictive setpoint algorithm. The defaults are
/// the operational values; every one of them can be overridden from
/// configuration.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    pub design_outdoor_winter: DegreeCelsius,
    pub design_outdoor_summer: DegreeCelsius,
    pub outdoor_reset_gain: f64,
    pub forecast_gain: f64,
    pub forecast_decay_hours: f64,
    pub forecast_horizon_hours: usize,
    pub solar_window_hours: usize,
    pub solar_threshold_wm2: f64,
    pub solar_gain: f64,
    pub error_gain: f64,
    pub band_halfwidth: f64,
    pub cold_band_extension: f64,
    pub min_target: DegreeCelsius,
    pub max_target: DegreeCelsius,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            design_outdoor_winter: DegreeCelsius(10.0),
            design_outdoor_summer: DegreeCelsius(25.0),
            outdoor_reset_gain: 0.4,
            forecast_gain: 0.3,
            forecast_decay_hours: 6.0,
            forecast_horizon_hours: 24,
            solar_window_hours: 6,
            solar_threshold_wm2: 200.0,
            solar_gain: 0.02,
            error_gain: 0.3,
            band_halfwidth: 2.0,
            cold_band_extension: 2.0,
            min_target: DegreeCelsius(16.0),
            max_target: DegreeCelsius(30.0),
        }
    }
}

/// Per-layer breakdown of a prediction, kept for diagnostics and metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PredictionComponents {
    pub base: DegreeCelsius,
    pub outdoor_reset: DegreeCelsius,
    pub forecast_adjustment: DegreeCelsius,
    pub solar_offset: DegreeCelsius,
    pub error_correction: DegreeCelsius,
    pub cold_weather_boost: DegreeCelsius,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub predicted_room_target: DegreeCelsius,
    pub components: PredictionComponents,
    pub reason: String,
}

/// Pure additive-layer prediction. Same inputs always produce the same
/// output; nothing here touches the clock or any client.
pub struct SetpointCalculator {
    config: CalculatorConfig,
}

impl SetpointCalculator {
    pub fn new(config: CalculatorConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, ctx: &ControlContext) -> PredictionResult {
        let cfg = &self.config;
        let base = ctx.user_comfort_target;

        let outdoor_reset = self.outdoor_reset(ctx);
        let forecast_adjustment = self.forecast_adjustment(ctx);
        let solar_offset = self.solar_offset(ctx);
        let error_correction = self.error_correction(ctx);
        let cold_weather_boost = self.cold_weather_boost(ctx);

        let components = PredictionComponents {
            base,
            outdoor_reset,
            forecast_adjustment,
            solar_offset,
            error_correction,
            cold_weather_boost,
        };

        let raw = base + outdoor_reset + forecast_adjustment + solar_offset + error_correction + cold_weather_boost;

        let upper_halfwidth = match ctx.season {
            SeasonMode::Winter if ctx.outdoor_temp.is_some_and(|t| t < DegreeCelsius(0.0)) => {
                cfg.band_halfwidth + cfg.cold_band_extension
            }
            _ => cfg.band_halfwidth,
        };
        let band_lower = base + DegreeCelsius(-cfg.band_halfwidth);
        let band_upper = base + DegreeCelsius(upper_halfwidth);

        let banded = raw.clamp(band_lower, band_upper);
        let bounded = banded.clamp(cfg.min_target, cfg.max_target);
        let predicted = bounded.round_half();

        let reason = self.describe(&components, raw, banded, bounded);

        PredictionResult {
            predicted_room_target: predicted,
            components,
            reason,
        }
    }

    /// L1: heat (cool) harder the further outdoors is below (above) the
    /// design temperature of the season.
    fn outdoor_reset(&self, ctx: &ControlContext) -> DegreeCelsius {
        let Some(outdoor) = ctx.outdoor_temp else {
            return DegreeCelsius(0.0);
        };

        let design = match ctx.season {
            SeasonMode::Winter => self.config.design_outdoor_winter,
            SeasonMode::Summer => self.config.design_outdoor_summer,
        };

        DegreeCelsius((self.config.outdoor_reset_gain * (design - outdoor).0).clamp(-2.0, 2.0))
    }

    /// L2: lean against where the outdoor temperature is heading. The
    /// adjustment is symmetric in both seasons: an approaching cold front
    /// raises the target ahead of time, an approaching heatwave lowers it.
    fn forecast_adjustment(&self, ctx: &ControlContext) -> DegreeCelsius {
        let cfg = &self.config;
        let temps = &ctx.forecast_temps;

        if temps.len() < cfg.forecast_horizon_hours {
            return DegreeCelsius(0.0);
        }

        let current = temps[0].0;
        let horizon = cfg.forecast_horizon_hours.min(temps.len());

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (hour, temp) in temps.iter().enumerate().take(horizon).skip(1) {
            let weight = (-(hour as f64) / cfg.forecast_decay_hours).exp();
            weighted_sum += weight * temp.0;
            weight_total += weight;
        }

        if weight_total == 0.0 {
            return DegreeCelsius(0.0);
        }

        let weighted_future = weighted_sum / weight_total;
        let adjustment = cfg.forecast_gain * (current - weighted_future);

        DegreeCelsius(adjustment.clamp(-1.0, 1.0))
    }

    /// L3: expected solar gain lets the room heat itself in winter.
    fn solar_offset(&self, ctx: &ControlContext) -> DegreeCelsius {
        if ctx.season != SeasonMode::Winter || ctx.forecast_solar.is_empty() {
            return DegreeCelsius(0.0);
        }

        let window = self.config.solar_window_hours.min(ctx.forecast_solar.len());
        let avg: f64 = ctx.forecast_solar.iter().take(window).map(f64::from).sum::<f64>() / window as f64;

        if avg <= self.config.solar_threshold_wm2 {
            return DegreeCelsius(0.0);
        }

        let reduction = self.config.solar_gain * (avg - self.config.solar_threshold_wm2);
        DegreeCelsius((-reduction).clamp(-2.0, 0.0))
    }

    /// L4: proportional correction of the current room error.
    fn error_correction(&self, ctx: &ControlContext) -> DegreeCelsius {
        let Some(room) = ctx.room_temp else {
            return DegreeCelsius(0.0);
        };

        let correction = self.config.error_gain * (ctx.user_comfort_target - room).0;
        DegreeCelsius(correction.clamp(-1.0, 1.0))
    }

    /// L5: extra push for duct installs whose AC sensor reads post-recuperator
    /// air and underestimates the heating need in deep cold.
    fn cold_weather_boost(&self, ctx: &ControlContext) -> DegreeCelsius {
        if ctx.season != SeasonMode::Winter {
            return DegreeCelsius(0.0);
        }

        let mut boost: f64 = match ctx.outdoor_temp {
            Some(t) if t < DegreeCelsius(-5.0) => 3.0,
            Some(t) if t < DegreeCelsius(0.0) => 2.0,
            Some(t) if t < DegreeCelsius(5.0) => 1.0,
            _ => 0.0,
        };

        let upcoming_min = ctx
            .forecast_temps
            .iter()
            .take(self.config.forecast_horizon_hours)
            .copied()
            .min_by(|a, b| a.partial_cmp(b).expect("forecast temps are never NaN"));

        if let Some(min) = upcoming_min {
            if min < DegreeCelsius(-5.0) {
                boost = boost.max(2.0);
            } else if min < DegreeCelsius(0.0) {
                boost = boost.max(1.0);
            }
        }

        DegreeCelsius(boost)
    }

    fn describe(
        &self,
        components: &PredictionComponents,
        raw: DegreeCelsius,
        banded: DegreeCelsius,
        bounded: DegreeCelsius,
    ) -> String {
        let mut parts = Vec::new();

        for (name, value) in [
            ("outdoor reset", components.outdoor_reset),
            ("forecast look-ahead", components.forecast_adjustment),
            ("solar gain", components.solar_offset),
            ("error correction", components.error_correction),
            ("cold weather boost", components.cold_weather_boost),
        ] {
            if value.abs() > 0.3 {
                parts.push(format!("{} {:+.1} °C", name, value.0));
            }
        }

        if banded != raw {
            parts.push("comfort band clamp".to_string());
        }
        if bounded != banded {
            parts.push("absolute range clamp".to_string());
        }

        if parts.is_empty() {
            "holding user target".to_string()
        } else {
            parts.join(", ")
        }
    }
}
