use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpClientConfig {
    bearer_token: Option<String>,
    timeout_secs: Option<u64>,
}

impl HttpClientConfig {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self {
            bearer_token,
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn new_tracing_client(&self) -> anyhow::Result<ClientWithMiddleware> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.bearer_token {
            let mut auth_value = header::HeaderValue::from_str(format!("Bearer {}", token).as_str())?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder.build()?;

        Ok(reqwest_middleware::ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build())
    }
}
