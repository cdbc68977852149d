mod detectors;
mod executor;
mod orchestrator;
mod setpoint;
mod state_machine;

pub use detectors::{ColdSnap, Heatwave, detect_cold_snap, detect_heatwave};
pub use executor::{ActionExecutor, ExecutorConfig};
pub use orchestrator::{DeviceRunner, ModeSelector, Orchestrator, OrchestratorConfig, RunnerConfig, TickReport};
pub use setpoint::{CalculatorConfig, PredictionComponents, PredictionResult, SetpointCalculator};
pub use state_machine::{HvacState, HvacStateMachine, StateMachineConfig, StateMachineDecision, Transition};

use serde::{Deserialize, Serialize};

use crate::core::unit::{DegreeCelsius, WattsPerSquareMeter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum SeasonMode {
    Winter,
    Summer,
}

/// Direction the AC is asked to work in. Dry/fan/auto modes pass through the
/// adapter untouched and never originate here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ThermalMode {
    Heat,
    Cool,
}

/// Everything the calculator and state machine see for one tick.
#[derive(Debug, Clone)]
pub struct ControlContext {
    pub user_comfort_target: DegreeCelsius,
    pub room_temp: Option<DegreeCelsius>,
    pub outdoor_temp: Option<DegreeCelsius>,
    pub forecast_temps: Vec<DegreeCelsius>,
    pub forecast_solar: Vec<WattsPerSquareMeter>,
    pub season: SeasonMode,
    pub ac_power: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HvacAction {
    /// Power on with an explicit heat/cool mode and setpoint.
    SetMode { mode: ThermalMode, setpoint: DegreeCelsius },
    /// Only move the setpoint, leave power and mode untouched.
    Coast { setpoint: DegreeCelsius },
}

impl HvacAction {
    pub fn setpoint(&self) -> DegreeCelsius {
        match self {
            HvacAction::SetMode { setpoint, .. } => *setpoint,
            HvacAction::Coast { setpoint } => *setpoint,
        }
    }
}
