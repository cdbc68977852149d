use reqwest::Client;
use serde::Deserialize;

use super::MetricPoint;
use crate::port::TimeSeriesSink;

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub base_url: String,
}

impl MetricsConfig {
    pub fn new_sink(&self) -> VictoriaSink {
        VictoriaSink::new(self.base_url.clone())
    }
}

/// Pushes tick metrics into VictoriaMetrics' Prometheus import endpoint.
pub struct VictoriaSink {
    client: Client,
    base_url: String,
}

impl VictoriaSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl TimeSeriesSink for VictoriaSink {
    async fn write_point(&self, point: MetricPoint) -> anyhow::Result<()> {
        let body = point.to_lines();
        if body.is_empty() {
            return Ok(());
        }

        let resp = self
            .client
            .post(format!("{}/api/v1/import/prometheus", self.base_url))
            .body(body)
            .send()
            .await?;

        resp.error_for_status_ref()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SeasonMode;
    use crate::core::time::DateTime;

    fn point(timestamp: DateTime) -> MetricPoint {
        MetricPoint {
            device_id: "bedroom".to_string(),
            hvac_state: "Standby".to_string(),
            season: SeasonMode::Summer,
            timestamp,
            fields: vec![("user_target", 24.0)],
        }
    }

    #[tokio::test]
    async fn write_point_posts_import_lines() {
        let mut server = mockito::Server::new_async().await;
        let at = DateTime::from_iso("2024-01-01T00:00:00Z").unwrap();

        let expected_body = format!(
            "climate_user_target{{device=\"bedroom\",hvac_state=\"Standby\",season=\"Summer\"}} 24 {}\n",
            at.millis()
        );

        let mock = server
            .mock("POST", "/api/v1/import/prometheus")
            .match_body(expected_body.as_str())
            .with_status(204)
            .create_async()
            .await;

        let sink = VictoriaSink::new(server.url());
        sink.write_point(point(at)).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn write_point_propagates_server_errors() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/api/v1/import/prometheus")
            .with_status(500)
            .create_async()
            .await;

        let sink = VictoriaSink::new(server.url());
        let at = DateTime::from_iso("2024-01-01T00:00:00Z").unwrap();

        assert!(sink.write_point(point(at)).await.is_err());
    }
}
