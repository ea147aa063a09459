use std::time::Duration;

/// Default sandbox endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.sandbox.midtrans.com";

/// Connection settings for [`HttpGatewayClient`](crate::HttpGatewayClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Sent as the Basic auth user name with an empty password.
    pub server_key: String,
    /// Bank processing can be slow; charges get a long timeout.
    pub charge_timeout: Duration,
    pub status_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            server_key: server_key.into(),
            ..Self::default()
        }
    }

    pub fn with_charge_timeout(mut self, timeout: Duration) -> Self {
        self.charge_timeout = timeout;
        self
    }

    pub fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            server_key: String::new(),
            charge_timeout: Duration::from_secs(180),
            status_timeout: Duration::from_secs(5),
        }
    }
}
