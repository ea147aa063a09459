//! Application configuration loaded from environment variables.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use gateway::GatewayConfig;
use payments::DEFAULT_NOTIFY_TOPIC;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory stores when unset
/// - `REDIS_URL`: profile cache URL; in-memory cache when unset
/// - `GATEWAY_BASE_URL`, `GATEWAY_SERVER_KEY`: payment gateway endpoint and key
/// - `GATEWAY_CHARGE_TIMEOUT_SECS` (default: `180`), `GATEWAY_STATUS_TIMEOUT_SECS` (default: `5`)
/// - `KAFKA_BROKERS`: notification brokers; notifications are kept in memory when unset
/// - `NOTIFY_TOPIC`: notification topic (default: `"concert-send-email-pdf"`)
/// - `DISPLAY_UTC_OFFSET_HOURS`: zone for displayed timestamps (default: `7`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub gateway_base_url: String,
    pub gateway_server_key: String,
    pub gateway_charge_timeout: Duration,
    pub gateway_status_timeout: Duration,
    pub kafka_brokers: Option<String>,
    pub notify_topic: String,
    pub display_utc_offset_hours: i32,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.parse().ok())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: var("DATABASE_URL"),
            redis_url: var("REDIS_URL"),
            gateway_base_url: var("GATEWAY_BASE_URL").unwrap_or(defaults.gateway_base_url),
            gateway_server_key: var("GATEWAY_SERVER_KEY").unwrap_or_default(),
            gateway_charge_timeout: parsed("GATEWAY_CHARGE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.gateway_charge_timeout),
            gateway_status_timeout: parsed("GATEWAY_STATUS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.gateway_status_timeout),
            kafka_brokers: var("KAFKA_BROKERS"),
            notify_topic: var("NOTIFY_TOPIC").unwrap_or(defaults.notify_topic),
            display_utc_offset_hours: parsed("DISPLAY_UTC_OFFSET_HOURS")
                .unwrap_or(defaults.display_utc_offset_hours),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(&self.gateway_base_url, &self.gateway_server_key)
            .with_charge_timeout(self.gateway_charge_timeout)
            .with_status_timeout(self.gateway_status_timeout)
    }

    /// Zone for displayed timestamps. Out-of-range offsets fall back to UTC.
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.display_utc_offset_hours.saturating_mul(3600))
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for Config {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            redis_url: None,
            gateway_base_url: gateway.base_url,
            gateway_server_key: String::new(),
            gateway_charge_timeout: gateway.charge_timeout,
            gateway_status_timeout: gateway.status_timeout,
            kafka_brokers: None,
            notify_topic: DEFAULT_NOTIFY_TOPIC.to_string(),
            display_utc_offset_hours: 7,
        }
    }
}
