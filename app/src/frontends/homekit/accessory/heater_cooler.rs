use super::super::{AccessoryCommand, HomekitCharacteristic, HomekitEvent, HomekitService, HomekitTarget};
use crate::control::{HvacState, ModeSelector, TickReport};
use crate::core::unit::DegreeCelsius;

//HAP wire values
const ACTIVE_INACTIVE: i64 = 0;
const ACTIVE_ACTIVE: i64 = 1;

const CURRENT_STATE_INACTIVE: i64 = 0;
const CURRENT_STATE_IDLE: i64 = 1;
const CURRENT_STATE_HEATING: i64 = 2;
const CURRENT_STATE_COOLING: i64 = 3;

const TARGET_STATE_AUTO: i64 = 0;
const TARGET_STATE_HEAT: i64 = 1;
const TARGET_STATE_COOL: i64 = 2;

#[derive(Default, Clone)]
struct ExportedStatus {
    active: Option<i64>,
    current_state: Option<i64>,
    target_state: Option<i64>,
    current_temp: Option<DegreeCelsius>,
    threshold_temp: Option<DegreeCelsius>,
}

/// HeaterCooler service for one device. Exports control state as
/// characteristic events and turns user writes back into orchestrator
/// commands. Only changed values are re-announced.
pub struct HeaterCooler {
    name: String,
    status: ExportedStatus,
}

impl HeaterCooler {
    pub fn new(name: String) -> Self {
        Self {
            name,
            status: ExportedStatus::default(),
        }
    }

    pub fn export_report(&mut self, report: &TickReport) -> Vec<HomekitEvent> {
        let mut events = Vec::new();

        let active = if report.power && report.state != HvacState::SensorFault {
            ACTIVE_ACTIVE
        } else {
            ACTIVE_INACTIVE
        };
        if self.status.active != Some(active) {
            self.status.active = Some(active);
            events.push(self.event(HomekitCharacteristic::Active, serde_json::json!(active)));
        }

        let current_state = match report.state {
            HvacState::HeatingActive | HvacState::PreHeat => CURRENT_STATE_HEATING,
            HvacState::CoolingActive | HvacState::PreCool => CURRENT_STATE_COOLING,
            HvacState::Standby | HvacState::HeatingCoast | HvacState::CoolingCoast => CURRENT_STATE_IDLE,
            HvacState::SensorFault => CURRENT_STATE_INACTIVE,
        };
        if self.status.current_state != Some(current_state) {
            self.status.current_state = Some(current_state);
            events.push(self.event(
                HomekitCharacteristic::CurrentHeaterCoolerState,
                serde_json::json!(current_state),
            ));
        }

        let target_state = match report.mode {
            ModeSelector::Auto => TARGET_STATE_AUTO,
            ModeSelector::Heat => TARGET_STATE_HEAT,
            ModeSelector::Cool => TARGET_STATE_COOL,
        };
        if self.status.target_state != Some(target_state) {
            self.status.target_state = Some(target_state);
            events.push(self.event(
                HomekitCharacteristic::TargetHeaterCoolerState,
                serde_json::json!(target_state),
            ));
        }

        //the accessory keeps presenting the last valid room temperature even
        //while the sensor is unavailable
        if let Some(room) = report.display_room_temp {
            if self.status.current_temp != Some(room) {
                self.status.current_temp = Some(room);
                events.push(self.event(HomekitCharacteristic::CurrentTemperature, serde_json::json!(room.0)));
            }
        }

        //thresholds always show the comfort target, never the compensated
        //value that goes to the AC
        if self.status.threshold_temp != Some(report.user_target) {
            self.status.threshold_temp = Some(report.user_target);
            events.push(self.event(
                HomekitCharacteristic::HeatingThresholdTemperature,
                serde_json::json!(report.user_target.0),
            ));
            events.push(self.event(
                HomekitCharacteristic::CoolingThresholdTemperature,
                serde_json::json!(report.user_target.0),
            ));
        }

        events
    }

    pub fn process_trigger(&self, trigger: &HomekitEvent) -> Option<AccessoryCommand> {
        if trigger.target == self.target(HomekitCharacteristic::HeatingThresholdTemperature)
            || trigger.target == self.target(HomekitCharacteristic::CoolingThresholdTemperature)
        {
            let target_temp = trigger
                .value
                .as_f64()
                .or_else(|| trigger.value.as_str().and_then(|value| value.parse::<f64>().ok()));

            if let Some(target_temp) = target_temp {
                //rounded to 0.5 degree celsius steps
                return Some(AccessoryCommand::TargetTemperature(DegreeCelsius(target_temp).round_half()));
            }

            tracing::warn!(
                "HeaterCooler {} received invalid threshold temperature payload: {}",
                self.name,
                trigger.value
            );
            return None;
        }

        if trigger.target == self.target(HomekitCharacteristic::TargetHeaterCoolerState) {
            let state = trigger
                .value
                .as_i64()
                .or_else(|| trigger.value.as_str().and_then(|value| value.parse::<i64>().ok()));

            return match state {
                Some(TARGET_STATE_AUTO) => Some(AccessoryCommand::TargetMode(ModeSelector::Auto)),
                Some(TARGET_STATE_HEAT) => Some(AccessoryCommand::TargetMode(ModeSelector::Heat)),
                Some(TARGET_STATE_COOL) => Some(AccessoryCommand::TargetMode(ModeSelector::Cool)),
                other => {
                    tracing::warn!(
                        "HeaterCooler {} received unsupported target state payload: {:?}",
                        self.name,
                        other
                    );
                    None
                }
            };
        }

        if trigger.target == self.target(HomekitCharacteristic::Active) {
            let active = trigger
                .value
                .as_i64()
                .or_else(|| trigger.value.as_str().and_then(|value| value.parse::<i64>().ok()));

            return match active {
                Some(ACTIVE_ACTIVE) => Some(AccessoryCommand::Active(true)),
                Some(ACTIVE_INACTIVE) => Some(AccessoryCommand::Active(false)),
                other => {
                    tracing::warn!(
                        "HeaterCooler {} received invalid active payload: {:?}",
                        self.name,
                        other
                    );
                    None
                }
            };
        }

        None
    }

    fn event(&self, characteristic: HomekitCharacteristic, value: serde_json::Value) -> HomekitEvent {
        HomekitEvent {
            target: self.target(characteristic),
            value,
        }
    }

    fn target(&self, characteristic: HomekitCharacteristic) -> HomekitTarget {
        HomekitTarget::new(self.name.clone(), HomekitService::HeaterCooler, characteristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{PredictionComponents, PredictionResult, SeasonMode};

    fn report(state: HvacState, room: Option<f64>, target: f64) -> TickReport {
        TickReport {
            room_temp: room.map(DegreeCelsius),
            display_room_temp: room.map(DegreeCelsius),
            outdoor_temp: None,
            solar: None,
            user_target: DegreeCelsius(target),
            season: SeasonMode::Winter,
            mode: ModeSelector::Heat,
            state,
            power: true,
            prediction: PredictionResult {
                predicted_room_target: DegreeCelsius(target),
                components: PredictionComponents::default(),
                reason: String::new(),
            },
            decision_reason: String::new(),
            compensated_setpoint: None,
        }
    }

    fn accessory() -> HeaterCooler {
        HeaterCooler::new("Klima Wohnzimmer".to_string())
    }

    fn value_of(events: &[HomekitEvent], characteristic: HomekitCharacteristic) -> Option<serde_json::Value> {
        events
            .iter()
            .find(|e| e.target.characteristic == characteristic)
            .map(|e| e.value.clone())
    }

    #[test]
    fn test_export_full_initial_state() {
        let mut accessory = accessory();

        let events = accessory.export_report(&report(HvacState::HeatingActive, Some(21.5), 23.0));

        assert_eq!(value_of(&events, HomekitCharacteristic::Active), Some(serde_json::json!(1)));
        assert_eq!(
            value_of(&events, HomekitCharacteristic::CurrentHeaterCoolerState),
            Some(serde_json::json!(2))
        );
        assert_eq!(
            value_of(&events, HomekitCharacteristic::TargetHeaterCoolerState),
            Some(serde_json::json!(1))
        );
        assert_eq!(
            value_of(&events, HomekitCharacteristic::CurrentTemperature),
            Some(serde_json::json!(21.5))
        );
        //both thresholds carry the comfort target
        assert_eq!(
            value_of(&events, HomekitCharacteristic::HeatingThresholdTemperature),
            Some(serde_json::json!(23.0))
        );
        assert_eq!(
            value_of(&events, HomekitCharacteristic::CoolingThresholdTemperature),
            Some(serde_json::json!(23.0))
        );
    }

    #[test]
    fn test_unchanged_state_is_not_reannounced() {
        let mut accessory = accessory();

        let first = accessory.export_report(&report(HvacState::Standby, Some(22.0), 23.0));
        assert!(!first.is_empty());

        let second = accessory.export_report(&report(HvacState::Standby, Some(22.0), 23.0));
        assert!(second.is_empty());

        //a room temp change announces exactly that
        let third = accessory.export_report(&report(HvacState::Standby, Some(22.5), 23.0));
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].target.characteristic, HomekitCharacteristic::CurrentTemperature);
    }

    #[test]
    fn test_sensor_fault_reports_inactive_with_last_temp() {
        let mut accessory = accessory();
        accessory.export_report(&report(HvacState::HeatingActive, Some(21.0), 23.0));

        let events = accessory.export_report(&report(HvacState::SensorFault, Some(21.0), 23.0));

        assert_eq!(value_of(&events, HomekitCharacteristic::Active), Some(serde_json::json!(0)));
        assert_eq!(
            value_of(&events, HomekitCharacteristic::CurrentHeaterCoolerState),
            Some(serde_json::json!(0))
        );
        //last valid temperature stays on display, so no new event for it
        assert_eq!(value_of(&events, HomekitCharacteristic::CurrentTemperature), None);
    }

    #[test]
    fn test_threshold_write_becomes_target_command() {
        let accessory = accessory();

        let trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Klima Wohnzimmer".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::HeatingThresholdTemperature,
            ),
            value: serde_json::json!(24.3),
        };

        assert_eq!(
            accessory.process_trigger(&trigger),
            Some(AccessoryCommand::TargetTemperature(DegreeCelsius(24.5)))
        );

        //string payloads happen with some bridges
        let trigger = HomekitEvent {
            value: serde_json::json!("22.0"),
            ..trigger
        };
        assert_eq!(
            accessory.process_trigger(&trigger),
            Some(AccessoryCommand::TargetTemperature(DegreeCelsius(22.0)))
        );
    }

    #[test]
    fn test_mode_and_active_writes() {
        let accessory = accessory();

        let mode_trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Klima Wohnzimmer".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::TargetHeaterCoolerState,
            ),
            value: serde_json::json!(2),
        };
        assert_eq!(
            accessory.process_trigger(&mode_trigger),
            Some(AccessoryCommand::TargetMode(ModeSelector::Cool))
        );

        let active_trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Klima Wohnzimmer".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::Active,
            ),
            value: serde_json::json!(0),
        };
        assert_eq!(accessory.process_trigger(&active_trigger), Some(AccessoryCommand::Active(false)));
    }

    #[test]
    fn test_foreign_accessory_triggers_are_ignored() {
        let accessory = accessory();

        let trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Anderes Gerät".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::Active,
            ),
            value: serde_json::json!(1),
        };

        assert_eq!(accessory.process_trigger(&trigger), None);
    }

    #[test]
    fn test_invalid_payloads_yield_no_command() {
        let accessory = accessory();

        let trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Klima Wohnzimmer".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::HeatingThresholdTemperature,
            ),
            value: serde_json::json!({"bogus": true}),
        };
        assert_eq!(accessory.process_trigger(&trigger), None);

        let trigger = HomekitEvent {
            target: HomekitTarget::new(
                "Klima Wohnzimmer".to_string(),
                HomekitService::HeaterCooler,
                HomekitCharacteristic::TargetHeaterCoolerState,
            ),
            value: serde_json::json!(9),
        };
        assert_eq!(accessory.process_trigger(&trigger), None);
    }
}
