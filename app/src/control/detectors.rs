use crate::core::unit::DegreeCelsius;

/// Detectors only trust a forecast with at least this many known samples.
const MIN_SAMPLES: usize = 24;

/// Pre-conditioning window: the extreme has to be far enough away to make
/// charging the building mass worthwhile, but close enough to matter.
const WINDOW_FROM_HOURS: usize = 12;
const WINDOW_TO_HOURS: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColdSnap {
    pub hours_until: usize,
    pub temp_drop: DegreeCelsius,
    pub min_temp: DegreeCelsius,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heatwave {
    pub hours_until: usize,
    pub peak_temp: DegreeCelsius,
}

/// A cold snap is a drop of at least 5 °C from now to a minimum that lies
/// 12 to 36 hours ahead.
pub fn detect_cold_snap(temps: &[DegreeCelsius]) -> Option<ColdSnap> {
    if temps.len() < MIN_SAMPLES {
        return None;
    }

    let (min_index, min_temp) = extreme_by(temps, |candidate, best| candidate < best)?;
    let temp_drop = temps[0] - min_temp;

    if temp_drop.0 >= 5.0 && in_window(min_index) {
        Some(ColdSnap {
            hours_until: min_index,
            temp_drop,
            min_temp,
        })
    } else {
        None
    }
}

/// A heatwave is a peak of at least 30 °C, 12 to 36 hours ahead.
pub fn detect_heatwave(temps: &[DegreeCelsius]) -> Option<Heatwave> {
    if temps.len() < MIN_SAMPLES {
        return None;
    }

    let (max_index, peak_temp) = extreme_by(temps, |candidate, best| candidate > best)?;

    if peak_temp.0 >= 30.0 && in_window(max_index) {
        Some(Heatwave {
            hours_until: max_index,
            peak_temp,
        })
    } else {
        None
    }
}

fn in_window(index: usize) -> bool {
    index > WINDOW_FROM_HOURS && index <= WINDOW_TO_HOURS
}

fn extreme_by(
    temps: &[DegreeCelsius],
    is_better: impl Fn(DegreeCelsius, DegreeCelsius) -> bool,
) -> Option<(usize, DegreeCelsius)> {
    let mut best: Option<(usize, DegreeCelsius)> = None;

    for (index, temp) in temps.iter().enumerate() {
        match best {
            Some((_, best_temp)) if !is_better(*temp, best_temp) => {}
            _ => best = Some((index, *temp)),
        }
    }

    best
}
