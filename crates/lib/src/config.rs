//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.linebot/config.json`) and environment.
//! Secrets (LINE channel access token, sensor access token) may come from env instead of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (LINE).
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Room sensor endpoint used by the "部屋" keyword.
    #[serde(default)]
    pub sensor: SensorConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for the webhook HTTP server (default 15151).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15151
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub line: LineChannelConfig,
}

/// LINE Messaging API channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineChannelConfig {
    /// Long-lived channel access token. Overridden by LINE_CHANNEL_ACCESS_TOKEN env when set.
    pub channel_access_token: Option<String>,
    /// Messaging API base URL (default https://api.line.me). Mostly useful for tests.
    pub api_base: Option<String>,
}

/// Sensor API endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorConfig {
    #[serde(default = "default_sensor_base_url")]
    pub base_url: String,

    #[serde(default = "default_sensor_node_id")]
    pub node_id: String,

    /// Access key appended as `access_token`. Overridden by SENSOR_ACCESS_TOKEN env.
    pub access_token: Option<String>,
}

fn default_sensor_base_url() -> String {
    "https://us.wio.seeed.io".to_string()
}

fn default_sensor_node_id() -> String {
    "GroveCo2MhZ16UART0".to_string()
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            base_url: default_sensor_base_url(),
            node_id: default_sensor_node_id(),
            access_token: None,
        }
    }
}

/// Env value wins over the config value; whitespace-only values count as unset.
fn env_or_config(env_key: &str, configured: Option<&String>) -> Option<String> {
    std::env::var(env_key)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            configured
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the LINE channel access token: env LINE_CHANNEL_ACCESS_TOKEN overrides config.
pub fn resolve_line_token(config: &Config) -> Option<String> {
    env_or_config(
        "LINE_CHANNEL_ACCESS_TOKEN",
        config.channels.line.channel_access_token.as_ref(),
    )
}

/// Resolve the sensor access token: env SENSOR_ACCESS_TOKEN overrides config.
pub fn resolve_sensor_token(config: &Config) -> Option<String> {
    env_or_config("SENSOR_ACCESS_TOKEN", config.sensor.access_token.as_ref())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("LINEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".linebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, LINEBOT_CONFIG_PATH, or the default path. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
