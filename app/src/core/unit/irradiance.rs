use std::fmt::Display;

use derive_more::derive::AsRef;
use serde::{Deserialize, Serialize};

/// Solar irradiance on a horizontal surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, AsRef, Serialize, Deserialize)]
pub struct WattsPerSquareMeter(pub f64);

impl From<&WattsPerSquareMeter> for f64 {
    fn from(value: &WattsPerSquareMeter) -> Self {
        value.0
    }
}

impl From<f64> for WattsPerSquareMeter {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<WattsPerSquareMeter> for f64 {
    fn from(value: WattsPerSquareMeter) -> Self {
        value.0
    }
}

impl Display for WattsPerSquareMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} W/m²", self.0)
    }
}
