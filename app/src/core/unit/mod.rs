mod degree_celsius;
mod irradiance;
mod percent;

pub use degree_celsius::DegreeCelsius;
pub use irradiance::WattsPerSquareMeter;
pub use percent::Percent;
