use serde::{Deserialize, Serialize};

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/ServiceDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomekitService {
    HeaterCooler,
}

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/CharacteristicDefinitions.ts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomekitCharacteristic {
    Active,
    CoolingThresholdTemperature,
    CurrentHeaterCoolerState,
    CurrentTemperature,
    HeatingThresholdTemperature,
    TargetHeaterCoolerState,
}
