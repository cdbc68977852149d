use super::SensorReading;
use crate::core::time::Duration;
use crate::core::unit::DegreeCelsius;
use crate::t;

/// Offset changes below this are jitter and ignored.
const OFFSET_HYSTERESIS: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// A reading older than this no longer counts as a valid room temperature.
    pub stale_after: Duration,
    pub ac_min_setpoint: DegreeCelsius,
    pub ac_max_setpoint: DegreeCelsius,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            stale_after: t!(5 minutes),
            ac_min_setpoint: DegreeCelsius(16.0),
            ac_max_setpoint: DegreeCelsius(30.0),
        }
    }
}

/// Keeps the most recent external reading and the offset between the AC's
/// built-in sensor and the room sensor. The AC tracks its own sensor, so
/// every setpoint sent to it has to be shifted by that offset to land the
/// room at the intended temperature.
pub struct SensorTracker {
    config: TrackerConfig,
    reading: Option<SensorReading>,
    online: bool,
    offset: Option<DegreeCelsius>,
}

impl SensorTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            reading: None,
            online: false,
            offset: None,
        }
    }

    pub fn record_reading(&mut self, reading: SensorReading) {
        if !self.online {
            tracing::info!("Room sensor back online at {}", reading.room_temp);
        }
        self.reading = Some(reading);
        self.online = true;
    }

    pub fn record_failure(&mut self) {
        if self.online {
            tracing::warn!("Room sensor unavailable, keeping last reading");
        }
        self.online = false;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Room temperature for control decisions. None while offline or stale,
    /// which drives the state machine into its sensor-fault state.
    pub fn room_temp(&self) -> Option<DegreeCelsius> {
        if !self.online {
            return None;
        }

        let reading = self.reading?;
        if reading.observed_at.elapsed() > self.config.stale_after {
            return None;
        }

        Some(reading.room_temp)
    }

    /// Last observation regardless of freshness, for display surfaces.
    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.reading.as_ref()
    }

    pub fn offset(&self) -> Option<DegreeCelsius> {
        self.offset
    }

    /// Recomputes the AC-vs-room offset from a fresh snapshot. Returns true
    /// when the published offset moved by more than the hysteresis, which is
    /// the caller's cue to re-dispatch the standing command.
    pub fn refresh_offset(&mut self, ac_sensor_temp: Option<DegreeCelsius>) -> bool {
        let (Some(ac_temp), Some(room_temp)) = (ac_sensor_temp, self.room_temp()) else {
            return false;
        };

        let new_offset = ac_temp - room_temp;

        match self.offset {
            Some(current) if (new_offset - current).abs() <= OFFSET_HYSTERESIS => false,
            _ => {
                tracing::info!(
                    "AC sensor offset changed to {} (AC reads {}, room is {})",
                    new_offset,
                    ac_temp,
                    room_temp
                );
                self.offset = Some(new_offset);
                true
            }
        }
    }

    /// Shifts a room target onto the AC's own temperature scale.
    pub fn compensate(&self, target: DegreeCelsius) -> DegreeCelsius {
        let offset = match self.offset {
            Some(offset) if self.online && offset.abs() >= OFFSET_HYSTERESIS => offset,
            _ => return target,
        };

        (target + offset)
            .round_half()
            .clamp(self.config.ac_min_setpoint, self.config.ac_max_setpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::DateTime;
    use crate::core::unit::Percent;

    fn tracker_with_offset(offset: f64) -> SensorTracker {
        let mut tracker = SensorTracker::new(TrackerConfig::default());
        tracker.record_reading(reading(20.0));
        tracker.refresh_offset(Some(DegreeCelsius(20.0 + offset)));
        tracker
    }

    fn reading(temp: f64) -> SensorReading {
        SensorReading {
            room_temp: DegreeCelsius(temp),
            humidity: Percent(45.0),
            observed_at: DateTime::now(),
        }
    }

    #[test]
    fn test_room_temp_null_while_offline() {
        let mut tracker = SensorTracker::new(TrackerConfig::default());
        assert_eq!(tracker.room_temp(), None);

        tracker.record_reading(reading(21.0));
        assert_eq!(tracker.room_temp(), Some(DegreeCelsius(21.0)));

        tracker.record_failure();
        assert_eq!(tracker.room_temp(), None);
        //the slot itself survives for display
        assert!(tracker.last_reading().is_some());
    }

    #[test]
    fn test_offset_hysteresis_ignores_jitter() {
        let mut tracker = tracker_with_offset(-4.0);
        assert_eq!(tracker.offset(), Some(DegreeCelsius(-4.0)));

        //0.2 °C of movement is jitter
        assert!(!tracker.refresh_offset(Some(DegreeCelsius(16.2))));
        assert_eq!(tracker.offset(), Some(DegreeCelsius(-4.0)));

        //0.5 °C is a real change
        assert!(tracker.refresh_offset(Some(DegreeCelsius(16.5))));
        assert_eq!(tracker.offset(), Some(DegreeCelsius(-3.5)));
    }

    #[test]
    fn test_offset_needs_both_readings() {
        let mut tracker = SensorTracker::new(TrackerConfig::default());
        assert!(!tracker.refresh_offset(Some(DegreeCelsius(18.0))));

        tracker.record_reading(reading(22.0));
        assert!(!tracker.refresh_offset(None));
        assert_eq!(tracker.offset(), None);
    }

    #[test]
    fn test_compensate_applies_offset_and_grid() {
        let tracker = tracker_with_offset(-4.2);

        //23 + (-4.2) = 18.8, snapped to 19.0
        assert_eq!(tracker.compensate(DegreeCelsius(23.0)), DegreeCelsius(19.0));
    }

    #[test]
    fn test_compensate_is_identity_for_small_offsets() {
        let tracker = tracker_with_offset(0.2);
        assert_eq!(tracker.compensate(DegreeCelsius(23.3)), DegreeCelsius(23.3));

        let mut offline = tracker_with_offset(-4.0);
        offline.record_failure();
        assert_eq!(offline.compensate(DegreeCelsius(23.0)), DegreeCelsius(23.0));
    }

    #[test]
    fn test_compensate_clamps_to_ac_range() {
        let winter = tracker_with_offset(-6.0);
        assert_eq!(winter.compensate(DegreeCelsius(17.0)), DegreeCelsius(16.0));

        let summer = tracker_with_offset(3.0);
        assert_eq!(summer.compensate(DegreeCelsius(29.0)), DegreeCelsius(30.0));
    }

    #[test]
    fn test_compensate_idempotent_where_offset_saturates() {
        //small offsets collapse to the identity
        let small = tracker_with_offset(0.2);
        let once = small.compensate(DegreeCelsius(23.3));
        assert_eq!(small.compensate(once), once);

        //large offsets saturate at the AC limits and stay there
        let winter = tracker_with_offset(-6.0);
        let once = winter.compensate(DegreeCelsius(17.0));
        assert_eq!(winter.compensate(once), once);

        let summer = tracker_with_offset(3.0);
        let once = summer.compensate(DegreeCelsius(29.0));
        assert_eq!(summer.compensate(once), once);
    }
}
