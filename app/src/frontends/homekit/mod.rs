mod accessory;
mod hap;

pub use accessory::HeaterCooler;
pub use hap::{HomekitCharacteristic, HomekitService};

use crate::control::ModeSelector;
use crate::core::unit::DegreeCelsius;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HomekitTarget {
    pub name: String,
    pub service: HomekitService,
    pub characteristic: HomekitCharacteristic,
}

impl HomekitTarget {
    pub fn new(name: String, service: HomekitService, characteristic: HomekitCharacteristic) -> Self {
        Self {
            name,
            service,
            characteristic,
        }
    }
}

/// Characteristic update, in either direction: exported device state or an
/// incoming user write. The transport bridging these onto HAP is not part
/// of the core.
#[derive(Debug, Clone)]
pub struct HomekitEvent {
    pub target: HomekitTarget,
    pub value: serde_json::Value,
}

/// A user write translated into orchestrator vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessoryCommand {
    TargetTemperature(DegreeCelsius),
    TargetMode(ModeSelector),
    Active(bool),
}
