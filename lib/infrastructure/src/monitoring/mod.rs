use std::error::Error;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub logs: EnvFilterConfig,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    pub filters: Vec<String>,
}

impl TryInto<EnvFilter> for EnvFilterConfig {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_into(self) -> Result<EnvFilter, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> Result<(), Box<dyn Error>> {
        let logging_filter: EnvFilter = self.logs.clone().try_into()?;
        let fmt_layer = tracing_subscriber::fmt::layer();

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(logging_filter)
            .init();

        tracing::debug!("Logging initialized for {}", self.service_name);

        Ok(())
    }
}
