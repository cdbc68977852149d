use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use super::{Forecast, HourlyForecast, Location};
use crate::core::time::DateTime;
use crate::core::unit::{DegreeCelsius, Percent, WattsPerSquareMeter};
use crate::t;

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct OpenMeteoClient {
    client: ClientWithMiddleware,
    base_url: String,
    location: Location,
}

impl OpenMeteoClient {
    pub fn new(location: Location) -> anyhow::Result<Self> {
        Self::with_base_url(location, "https://api.open-meteo.com")
    }

    pub fn with_base_url(location: Location, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(None)
            .with_timeout(REQUEST_TIMEOUT_SECS)
            .new_tracing_client()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            location,
        })
    }

    pub async fn fetch_forecast(&self) -> anyhow::Result<Forecast> {
        let response = self
            .client
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&[
                ("latitude", self.location.latitude.to_string()),
                ("longitude", self.location.longitude.to_string()),
                (
                    "hourly",
                    "temperature_2m,shortwave_radiation,direct_radiation,cloud_cover,wind_speed_10m".to_string(),
                ),
                ("forecast_days", "2".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await?;

        let response = response.error_for_status()?;

        let payload = response
            .json::<OpenMeteoResponse>()
            .await
            .context("Error decoding Open-Meteo response")?;

        Ok(Forecast::new(t!(now), payload.hourly.into_samples()?))
    }
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: OpenMeteoHourly,
}

/// Hourly arrays aligned by index, as Open-Meteo delivers them.
#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    shortwave_radiation: Vec<Option<f64>>,
    #[serde(default)]
    direct_radiation: Vec<Option<f64>>,
    #[serde(default)]
    cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

impl OpenMeteoHourly {
    fn into_samples(self) -> anyhow::Result<Vec<HourlyForecast>> {
        let mut samples = Vec::with_capacity(self.time.len());

        for (i, time) in self.time.iter().enumerate() {
            let timestamp = parse_hour(time).with_context(|| format!("Invalid forecast timestamp '{}'", time))?;

            samples.push(HourlyForecast {
                timestamp,
                outdoor_temp: value_at(&self.temperature_2m, i).map(DegreeCelsius),
                solar_radiation: value_at(&self.shortwave_radiation, i).map(WattsPerSquareMeter),
                direct_radiation: value_at(&self.direct_radiation, i).map(WattsPerSquareMeter),
                cloud_cover: value_at(&self.cloud_cover, i).map(Percent),
                wind_speed: value_at(&self.wind_speed_10m, i),
            });
        }

        Ok(samples)
    }
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

fn parse_hour(value: &str) -> anyhow::Result<DateTime> {
    //Open-Meteo sends "2025-01-15T08:00" without an offset; we request UTC
    let naive = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")?;
    Ok(naive.and_utc().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> Location {
        Location {
            latitude: 52.52,
            longitude: 13.4,
        }
    }

    #[tokio::test]
    async fn fetch_zips_hourly_arrays_into_samples() {
        let mut server = mockito::Server::new_async().await;

        let body = serde_json::json!({
            "hourly": {
                "time": ["2025-01-15T08:00", "2025-01-15T09:00"],
                "temperature_2m": [-4.2, null],
                "shortwave_radiation": [55.0, 120.0],
                "direct_radiation": [10.0, 80.0],
                "cloud_cover": [90.0, 40.0],
                "wind_speed_10m": [12.5, null]
            }
        });

        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::UrlEncoded("forecast_days".into(), "2".into()))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(location(), server.url()).unwrap();
        let forecast = client.fetch_forecast().await.unwrap();

        mock.assert_async().await;

        assert_eq!(forecast.hourly.len(), 2);
        assert_eq!(forecast.hourly[0].outdoor_temp, Some(DegreeCelsius(-4.2)));
        assert_eq!(forecast.hourly[1].outdoor_temp, None);
        assert_eq!(forecast.hourly[1].solar_radiation, Some(WattsPerSquareMeter(120.0)));
        assert_eq!(forecast.hourly[0].wind_speed, Some(12.5));
    }

    #[tokio::test]
    async fn fetch_propagates_http_errors() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("GET", "/v1/forecast")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = OpenMeteoClient::with_base_url(location(), server.url()).unwrap();

        assert!(client.fetch_forecast().await.is_err());
    }
}
