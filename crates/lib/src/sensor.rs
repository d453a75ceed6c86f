//! Room sensor client: CO2 concentration and temperature from the Wio node API.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{self, Config};

/// One reading from the sensor node.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SensorReading {
    pub concentration: f64,
    pub temperature: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("sensor api error: {0}")]
    Status(String),
    #[error("sensor access token not configured")]
    MissingToken,
}

/// Source of sensor readings. The dispatcher only sees this trait so tests can swap in fakes.
#[async_trait]
pub trait SensorSource: Send + Sync {
    async fn read(&self) -> Result<SensorReading, SensorError>;
}

/// Client for the sensor HTTP API.
#[derive(Clone)]
pub struct SensorClient {
    base_url: String,
    node_id: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl SensorClient {
    pub fn new(base_url: &str, node_id: &str, access_token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            node_id: node_id.to_string(),
            access_token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.sensor.base_url,
            &config.sensor.node_id,
            config::resolve_sensor_token(config),
        )
    }

    fn url(&self, token: &str) -> String {
        format!(
            "{}/v1/node/{}/concentration_and_temperature?access_token={}",
            self.base_url, self.node_id, token
        )
    }
}

#[async_trait]
impl SensorSource for SensorClient {
    /// GET /v1/node/{node}/concentration_and_temperature
    async fn read(&self) -> Result<SensorReading, SensorError> {
        let token = self.access_token.as_deref().ok_or(SensorError::MissingToken)?;
        let res = self.client.get(self.url(token)).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SensorError::Status(format!("{} {}", status, body)));
        }
        let reading: SensorReading = res.json().await?;
        Ok(reading)
    }
}
