mod client;

pub use client::{MelcloudClient, MelcloudConfig};

use crate::control::ThermalMode;
use crate::core::unit::DegreeCelsius;

/// Wire values of the AC's operation mode register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum OperationMode {
    Heat,
    Dry,
    Cool,
    Fan,
    Auto,
    ISeeHeat,
    ISeeDry,
    ISeeCool,
}

impl OperationMode {
    pub fn from_raw(value: i64) -> Option<Self> {
        match value {
            1 => Some(OperationMode::Heat),
            2 => Some(OperationMode::Dry),
            3 => Some(OperationMode::Cool),
            7 => Some(OperationMode::Fan),
            8 => Some(OperationMode::Auto),
            9 => Some(OperationMode::ISeeHeat),
            10 => Some(OperationMode::ISeeDry),
            11 => Some(OperationMode::ISeeCool),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            OperationMode::Heat => 1,
            OperationMode::Dry => 2,
            OperationMode::Cool => 3,
            OperationMode::Fan => 7,
            OperationMode::Auto => 8,
            OperationMode::ISeeHeat => 9,
            OperationMode::ISeeDry => 10,
            OperationMode::ISeeCool => 11,
        }
    }
}

impl From<ThermalMode> for OperationMode {
    fn from(mode: ThermalMode) -> Self {
        match mode {
            ThermalMode::Heat => OperationMode::Heat,
            ThermalMode::Cool => OperationMode::Cool,
        }
    }
}

/// Bit mask selecting which fields of a command the device applies.
pub mod effective_flags {
    pub const POWER: u32 = 0x01;
    pub const OPERATION_MODE: u32 = 0x02;
    pub const SET_TEMPERATURE: u32 = 0x04;
    pub const PROHIBIT: u32 = 0x08;
    pub const POWER_OPERATION_MODE_SET_TEMPERATURE: u32 = POWER | OPERATION_MODE | SET_TEMPERATURE;
}

/// Loosely-typed device state as the cloud reports it. Every observable is
/// optional; a missing field degrades the control path instead of failing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    pub power: Option<bool>,
    pub operation_mode: Option<OperationMode>,
    pub ac_sensor_temp: Option<DegreeCelsius>,
    pub ac_set_temp: Option<DegreeCelsius>,
    pub user_prohibit: bool,
    //passed through untouched, never driven by the core
    pub fan_speed: Option<i64>,
    pub vane_vertical: Option<i64>,
    pub vane_horizontal: Option<i64>,
}

impl DeviceSnapshot {
    pub fn is_powered(&self) -> bool {
        self.power.unwrap_or(false)
    }
}

/// One atomic command. Only fields selected by `effective_flags` are applied
/// by the device.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_mode: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_temperature: Option<f64>,
    pub effective_flags: u32,
}

impl DeviceUpdate {
    /// Power on with an explicit mode and setpoint, applied as one call.
    pub fn set_mode(mode: OperationMode, setpoint: DegreeCelsius) -> Self {
        Self {
            power: Some(true),
            operation_mode: Some(mode.as_raw()),
            set_temperature: Some(setpoint.0),
            effective_flags: effective_flags::POWER_OPERATION_MODE_SET_TEMPERATURE,
        }
    }

    /// Move only the setpoint, power and mode stay as they are.
    pub fn coast(setpoint: DegreeCelsius) -> Self {
        Self {
            power: None,
            operation_mode: None,
            set_temperature: Some(setpoint.0),
            effective_flags: effective_flags::SET_TEMPERATURE,
        }
    }

    pub fn set_power(on: bool) -> Self {
        Self {
            power: Some(on),
            operation_mode: None,
            set_temperature: None,
            effective_flags: effective_flags::POWER,
        }
    }
}
