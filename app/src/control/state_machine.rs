use std::collections::VecDeque;

use super::{ControlContext, HvacAction, SeasonMode, ThermalMode, detect_cold_snap, detect_heatwave};
use crate::core::time::{DateTime, Duration};
use crate::core::unit::DegreeCelsius;
use crate::t;

const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct StateMachineConfig {
    pub deadband: f64,
    pub hysteresis: f64,
    pub min_on: Duration,
    pub min_off: Duration,
    pub min_mode_switch: Duration,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            deadband: 4.0,
            hysteresis: 2.0,
            min_on: t!(300 seconds),
            min_off: t!(180 seconds),
            min_mode_switch: t!(600 seconds),
        }
    }
}

impl StateMachineConfig {
    fn half_deadband(&self) -> f64 {
        self.deadband / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, serde::Serialize)]
pub enum HvacState {
    Standby,
    HeatingActive,
    CoolingActive,
    PreHeat,
    PreCool,
    HeatingCoast,
    CoolingCoast,
    SensorFault,
}

impl HvacState {
    /// Active states hold the compressor on; they are what the dwell-time
    /// guards protect.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            HvacState::HeatingActive | HvacState::CoolingActive | HvacState::PreHeat | HvacState::PreCool
        )
    }

    pub fn family(&self) -> Option<ThermalMode> {
        match self {
            HvacState::HeatingActive | HvacState::PreHeat | HvacState::HeatingCoast => Some(ThermalMode::Heat),
            HvacState::CoolingActive | HvacState::PreCool | HvacState::CoolingCoast => Some(ThermalMode::Cool),
            HvacState::Standby | HvacState::SensorFault => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub from: HvacState,
    pub to: HvacState,
    pub at: DateTime,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct StateMachineDecision {
    pub state: HvacState,
    pub action: Option<HvacAction>,
    pub reason: String,
}

/// Eight-state HVAC controller with anti-oscillation dwell times. Pure in
/// the sense that it only reads the clock; all I/O stays with the caller.
pub struct HvacStateMachine {
    config: StateMachineConfig,
    state: HvacState,
    entered_at: DateTime,
    last_on_at: Option<DateTime>,
    last_off_at: Option<DateTime>,
    last_mode_switch_at: Option<DateTime>,
    last_family: Option<ThermalMode>,
    history: VecDeque<Transition>,
}

impl HvacStateMachine {
    pub fn new(config: StateMachineConfig) -> Self {
        Self {
            config,
            state: HvacState::Standby,
            entered_at: t!(now),
            last_on_at: None,
            last_off_at: None,
            last_mode_switch_at: None,
            last_family: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn current_state(&self) -> HvacState {
        self.state
    }

    pub fn time_in_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    pub fn history(&self) -> &VecDeque<Transition> {
        &self.history
    }

    /// Back to STANDBY with cleared timers, e.g. after a device restart.
    pub fn reset(&mut self) {
        self.record_transition(HvacState::Standby, "reset");
        self.state = HvacState::Standby;
        self.entered_at = t!(now);
        self.clear_timers();
    }

    /// Guard-bypassing transition for diagnostics and manual override.
    pub fn force(&mut self, state: HvacState, reason: &str) {
        let from = self.state;
        self.apply_transition(state, reason);
        tracing::warn!("Forced transition {} -> {}: {}", from, state, reason);
    }

    pub fn step(&mut self, ctx: &ControlContext, predicted: DegreeCelsius) -> StateMachineDecision {
        let Some(room) = ctx.room_temp else {
            return self.enter_sensor_fault();
        };

        let (desired, reason) = self.desired_state(room, ctx);

        if desired == self.state {
            return StateMachineDecision {
                state: self.state,
                action: None,
                reason,
            };
        }

        if let Some(blocked) = self.transition_blocked(desired) {
            return StateMachineDecision {
                state: self.state,
                action: None,
                reason: blocked,
            };
        }

        self.apply_transition(desired, &reason);

        StateMachineDecision {
            state: desired,
            action: self.action_for(desired, predicted),
            reason,
        }
    }

    /// Standing action of a state, used by the drift re-dispatch path when
    /// `step` itself had nothing to do.
    pub fn action_for(&self, state: HvacState, predicted: DegreeCelsius) -> Option<HvacAction> {
        match state {
            HvacState::HeatingActive | HvacState::PreHeat => Some(HvacAction::SetMode {
                mode: ThermalMode::Heat,
                setpoint: predicted,
            }),
            HvacState::CoolingActive | HvacState::PreCool => Some(HvacAction::SetMode {
                mode: ThermalMode::Cool,
                setpoint: predicted,
            }),
            HvacState::Standby | HvacState::HeatingCoast | HvacState::CoolingCoast => {
                Some(HvacAction::Coast { setpoint: predicted })
            }
            HvacState::SensorFault => None,
        }
    }

    fn enter_sensor_fault(&mut self) -> StateMachineDecision {
        let reason = "room temperature unavailable";

        //unconditional: a blind controller must not keep driving the AC
        if self.state != HvacState::SensorFault {
            self.apply_transition(HvacState::SensorFault, reason);
            self.clear_timers();
        }

        StateMachineDecision {
            state: HvacState::SensorFault,
            action: None,
            reason: reason.to_string(),
        }
    }

    fn desired_state(&self, room: DegreeCelsius, ctx: &ControlContext) -> (HvacState, String) {
        //forecast-driven pre-conditioning outranks the deviation rules
        match ctx.season {
            SeasonMode::Winter if self.state.family() != Some(ThermalMode::Heat) => {
                if let Some(snap) = detect_cold_snap(&ctx.forecast_temps) {
                    return (
                        HvacState::PreHeat,
                        format!(
                            "cold snap: {:.1} °C drop to {} in {} h",
                            snap.temp_drop.0, snap.min_temp, snap.hours_until
                        ),
                    );
                }
            }
            SeasonMode::Summer if self.state.family() != Some(ThermalMode::Cool) => {
                if let Some(wave) = detect_heatwave(&ctx.forecast_temps) {
                    return (
                        HvacState::PreCool,
                        format!("heatwave: {} peak in {} h", wave.peak_temp, wave.hours_until),
                    );
                }
            }
            _ => {}
        }

        let dev = (room - ctx.user_comfort_target).0;
        let hysteresis = self.config.hysteresis;
        let half_deadband = self.config.half_deadband();

        let desired = match ctx.season {
            SeasonMode::Winter => {
                if dev < -hysteresis {
                    Some((
                        HvacState::HeatingActive,
                        format!("room {:.1} °C below target", -dev),
                    ))
                } else if dev > half_deadband {
                    if self.state.family() == Some(ThermalMode::Heat) {
                        Some((HvacState::HeatingCoast, "room warm enough, coasting".to_string()))
                    } else {
                        Some((HvacState::Standby, "room above target".to_string()))
                    }
                } else if self.state == HvacState::HeatingCoast && dev > -0.5 {
                    Some((HvacState::Standby, "coast complete".to_string()))
                } else {
                    None
                }
            }
            SeasonMode::Summer => {
                if dev > hysteresis {
                    Some((
                        HvacState::CoolingActive,
                        format!("room {:.1} °C above target", dev),
                    ))
                } else if dev < -half_deadband {
                    if self.state.family() == Some(ThermalMode::Cool) {
                        Some((HvacState::CoolingCoast, "room cool enough, coasting".to_string()))
                    } else {
                        Some((HvacState::Standby, "room below target".to_string()))
                    }
                } else if self.state == HvacState::CoolingCoast && dev < 0.5 {
                    Some((HvacState::Standby, "coast complete".to_string()))
                } else {
                    None
                }
            }
        };

        match desired {
            Some(desired) => desired,
            //after a sensor fault there is no meaningful previous state to
            //hold, restart from standby
            None if self.state == HvacState::SensorFault => (HvacState::Standby, "sensor recovered".to_string()),
            None => (self.state, format!("holding {}", self.state)),
        }
    }

    fn transition_blocked(&self, desired: HvacState) -> Option<String> {
        let now = t!(now);

        if self.state.is_active() && !desired.is_active() {
            if let Some(on_at) = self.last_on_at {
                if now.elapsed_since(on_at) < self.config.min_on {
                    return Some(format!(
                        "{} -> {} blocked by anti-oscillation timer (min on time)",
                        self.state, desired
                    ));
                }
            }
        }

        if !self.state.is_active() && desired.is_active() {
            if let Some(off_at) = self.last_off_at {
                if now.elapsed_since(off_at) < self.config.min_off {
                    return Some(format!(
                        "{} -> {} blocked by anti-oscillation timer (min off time)",
                        self.state, desired
                    ));
                }
            }
        }

        if let (Some(desired_family), Some(last_family)) = (desired.family(), self.last_family) {
            if desired_family != last_family {
                if let Some(switch_at) = self.last_mode_switch_at {
                    if now.elapsed_since(switch_at) < self.config.min_mode_switch {
                        return Some(format!(
                            "{} -> {} blocked by anti-oscillation timer (mode switch delay)",
                            self.state, desired
                        ));
                    }
                }
            }
        }

        None
    }

    fn apply_transition(&mut self, to: HvacState, reason: &str) {
        let now = t!(now);
        let from = self.state;

        if to.is_active() && !from.is_active() {
            self.last_on_at = Some(now);
        }
        if from.is_active() && !to.is_active() {
            self.last_off_at = Some(now);
        }

        if from.family() != to.family() {
            self.last_mode_switch_at = Some(now);
        }
        if let Some(family) = to.family() {
            self.last_family = Some(family);
        }

        self.record_transition(to, reason);
        self.state = to;
        self.entered_at = now;

        tracing::info!("HVAC state {} -> {}: {}", from, to, reason);
    }

    fn record_transition(&mut self, to: HvacState, reason: &str) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(Transition {
            from: self.state,
            to,
            at: t!(now),
            reason: reason.to_string(),
        });
    }

    fn clear_timers(&mut self) {
        self.last_on_at = None;
        self.last_off_at = None;
        self.last_mode_switch_at = None;
        self.last_family = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FIXED_NOW;

    fn winter_ctx(room: Option<f64>, target: f64) -> ControlContext {
        ControlContext {
            user_comfort_target: DegreeCelsius(target),
            room_temp: room.map(DegreeCelsius),
            outdoor_temp: Some(DegreeCelsius(-2.0)),
            forecast_temps: Vec::new(),
            forecast_solar: Vec::new(),
            season: SeasonMode::Winter,
            ac_power: true,
        }
    }

    fn summer_ctx(room: Option<f64>, target: f64) -> ControlContext {
        ControlContext {
            season: SeasonMode::Summer,
            outdoor_temp: Some(DegreeCelsius(30.0)),
            ..winter_ctx(room, target)
        }
    }

    fn at<T>(base: DateTime, offset_secs: i64, f: impl FnOnce() -> T) -> T {
        FIXED_NOW.sync_scope(base + Duration::seconds(offset_secs), f)
    }

    fn t0() -> DateTime {
        DateTime::from_iso("2025-01-15T08:00:00Z").unwrap()
    }

    const PREDICTED: DegreeCelsius = DegreeCelsius(24.0);

    #[test]
    fn test_starts_in_standby() {
        let machine = HvacStateMachine::new(StateMachineConfig::default());
        assert_eq!(machine.current_state(), HvacState::Standby);
    }

    #[test]
    fn test_cold_room_starts_heating_with_set_mode() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        let decision = machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);

        assert_eq!(decision.state, HvacState::HeatingActive);
        assert_eq!(
            decision.action,
            Some(HvacAction::SetMode {
                mode: ThermalMode::Heat,
                setpoint: PREDICTED,
            })
        );
    }

    #[test]
    fn test_small_deviation_holds_standby() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        //-0.5 °C is inside the hysteresis
        let decision = machine.step(&winter_ctx(Some(22.5), 23.0), PREDICTED);

        assert_eq!(decision.state, HvacState::Standby);
        assert_eq!(decision.action, None);
    }

    #[test]
    fn test_null_room_temp_is_sensor_fault_without_action() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        for _ in 0..10 {
            let decision = machine.step(&winter_ctx(None, 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::SensorFault);
            assert_eq!(decision.action, None);
        }
    }

    #[test]
    fn test_sensor_recovery_reenters_from_clean_baseline() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || {
            machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingActive);
        });

        //sensor drops out while active: fault wins over every guard
        at(base, 60, || {
            let decision = machine.step(&winter_ctx(None, 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::SensorFault);
        });

        //recovery right away: guards evaluate from a clean inactive baseline
        at(base, 90, || {
            let decision = machine.step(&winter_ctx(Some(20.5), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingActive);
            assert_eq!(
                decision.action,
                Some(HvacAction::SetMode {
                    mode: ThermalMode::Heat,
                    setpoint: PREDICTED,
                })
            );
        });
    }

    #[test]
    fn test_sensor_recovery_without_deviation_goes_standby() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        machine.step(&winter_ctx(None, 23.0), PREDICTED);
        assert_eq!(machine.current_state(), HvacState::SensorFault);

        let decision = machine.step(&winter_ctx(Some(22.8), 23.0), PREDICTED);
        assert_eq!(decision.state, HvacState::Standby);
        assert_eq!(decision.action, Some(HvacAction::Coast { setpoint: PREDICTED }));
    }

    #[test]
    fn test_min_on_blocks_early_exit() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || {
            machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingActive);
        });

        //room overshot hard, but the compressor only just started
        at(base, 60, || {
            let decision = machine.step(&winter_ctx(Some(26.0), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingActive);
            assert_eq!(decision.action, None);
            assert!(decision.reason.contains("blocked"), "reason: {}", decision.reason);
        });

        //past min-on the coast is allowed
        at(base, 301, || {
            let decision = machine.step(&winter_ctx(Some(25.5), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingCoast);
            assert_eq!(decision.action, Some(HvacAction::Coast { setpoint: PREDICTED }));
        });
    }

    #[test]
    fn test_min_off_blocks_early_restart() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED));
        //leave heating after min-on
        at(base, 320, || {
            machine.step(&winter_ctx(Some(25.5), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingCoast);
        });

        //cold again almost immediately: min-off not yet served
        at(base, 400, || {
            let decision = machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingCoast);
            assert_eq!(decision.action, None);
            assert!(decision.reason.contains("blocked"));
        });

        at(base, 320 + 181, || {
            let decision = machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingActive);
        });
    }

    #[test]
    fn test_mode_switch_delay_spans_standby() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, -300, || {
            machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingActive);
        });

        //heating ends at t=0
        at(base, 0, || {
            machine.step(&winter_ctx(Some(25.5), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingCoast);
        });
        at(base, 60, || {
            machine.step(&winter_ctx(Some(22.8), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::Standby);
        });

        //season flipped, hot room at t=500: heat->cool still embargoed
        at(base, 500, || {
            let decision = machine.step(&summer_ctx(Some(28.0), 24.0), PREDICTED);
            assert_eq!(decision.state, HvacState::Standby);
            assert_eq!(decision.action, None);
            assert!(decision.reason.contains("blocked"));
        });

        at(base, 661, || {
            let decision = machine.step(&summer_ctx(Some(28.0), 24.0), PREDICTED);
            assert_eq!(decision.state, HvacState::CoolingActive);
            assert_eq!(
                decision.action,
                Some(HvacAction::SetMode {
                    mode: ThermalMode::Cool,
                    setpoint: PREDICTED,
                })
            );
        });
    }

    #[test]
    fn test_cold_snap_triggers_pre_heat() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        let mut ctx = winter_ctx(Some(22.8), 23.0);
        let mut temps = vec![-2.0; 48];
        temps[20] = -9.0;
        ctx.forecast_temps = temps.into_iter().map(DegreeCelsius).collect();

        let decision = machine.step(&ctx, PREDICTED);

        assert_eq!(decision.state, HvacState::PreHeat);
        assert_eq!(
            decision.action,
            Some(HvacAction::SetMode {
                mode: ThermalMode::Heat,
                setpoint: PREDICTED,
            })
        );
        assert!(decision.reason.contains("cold snap"));
    }

    #[test]
    fn test_near_cold_dip_does_not_pre_heat() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        //minimum at hour 8 is too close to pre-charge for
        let mut ctx = winter_ctx(Some(22.5), 23.0);
        let mut temps = vec![-5.0; 48];
        temps[8] = -10.0;
        ctx.forecast_temps = temps.into_iter().map(DegreeCelsius).collect();

        let decision = machine.step(&ctx, PREDICTED);

        assert_eq!(decision.state, HvacState::Standby);
    }

    #[test]
    fn test_heatwave_triggers_pre_cool_once() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        let mut ctx = summer_ctx(Some(25.0), 24.0);
        let mut temps = vec![28.0; 48];
        temps[18] = 35.0;
        ctx.forecast_temps = temps.into_iter().map(DegreeCelsius).collect();

        let decision = machine.step(&ctx, PREDICTED);
        assert_eq!(decision.state, HvacState::PreCool);

        //already in the cooling family: detector no longer fires
        let decision = machine.step(&ctx, PREDICTED);
        assert_eq!(decision.state, HvacState::PreCool);
        assert_eq!(decision.action, None);
    }

    #[test]
    fn test_summer_mirror_coast_cycle() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || {
            machine.step(&summer_ctx(Some(27.0), 24.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::CoolingActive);
        });

        at(base, 400, || {
            machine.step(&summer_ctx(Some(21.5), 24.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::CoolingCoast);
        });

        at(base, 500, || {
            let decision = machine.step(&summer_ctx(Some(24.2), 24.0), PREDICTED);
            assert_eq!(decision.state, HvacState::Standby);
            assert_eq!(decision.reason, "coast complete");
        });
    }

    #[test]
    fn test_history_and_time_in_state() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || {
            machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
        });

        at(base, 120, || {
            assert_eq!(machine.time_in_state(), Duration::seconds(120));
        });

        assert_eq!(machine.history().len(), 1);
        let transition = &machine.history()[0];
        assert_eq!(transition.from, HvacState::Standby);
        assert_eq!(transition.to, HvacState::HeatingActive);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());

        for i in 0..60 {
            machine.force(
                if i % 2 == 0 { HvacState::Standby } else { HvacState::SensorFault },
                "churn",
            );
        }

        assert_eq!(machine.history().len(), HISTORY_CAPACITY);
    }

    #[test]
    fn test_force_bypasses_guards_and_reset_clears() {
        let mut machine = HvacStateMachine::new(StateMachineConfig::default());
        let base = t0();

        at(base, 0, || {
            machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(machine.current_state(), HvacState::HeatingActive);

            //min-on would block this, force does not care
            machine.force(HvacState::Standby, "manual override");
            assert_eq!(machine.current_state(), HvacState::Standby);
        });

        at(base, 10, || {
            machine.reset();
            assert_eq!(machine.current_state(), HvacState::Standby);

            //timers are gone: re-entering active is immediately allowed
            let decision = machine.step(&winter_ctx(Some(20.0), 23.0), PREDICTED);
            assert_eq!(decision.state, HvacState::HeatingActive);
        });
    }
}
