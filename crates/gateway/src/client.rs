//! HTTP client for the payment gateway.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::PaymentId;
use reqwest::{Client, RequestBuilder};

use crate::wire::{decode, require_status};
use crate::{
    ChargeRequest, ChargeResponse, GatewayConfig, GatewayError, PaymentGateway, Result,
    StatusResponse,
};

/// Gateway client over HTTPS.
///
/// Any transport error, non-2xx HTTP status, failing body `status_code`, or
/// schema mismatch is returned as an error.
#[derive(Clone)]
pub struct HttpGatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl HttpGatewayClient {
    /// Creates a client. Configuration is passed in, never read from the
    /// environment here.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder, timeout: Duration) -> RequestBuilder {
        request
            .basic_auth(&self.config.server_key, Some(""))
            .header("accept", "application/json")
            .timeout(timeout)
    }

    async fn send(request: RequestBuilder) -> Result<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

fn record<T>(operation: &'static str, started: Instant, result: &Result<T>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(GatewayError::Transport(_)) => "transport_error",
        Err(GatewayError::HttpStatus { .. }) => "http_error",
        Err(GatewayError::Rejected { .. }) => "rejected",
        Err(GatewayError::Parse(_)) | Err(GatewayError::EmptyResponse) => "invalid_response",
    };
    metrics::counter!("gateway_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

#[async_trait]
impl PaymentGateway for HttpGatewayClient {
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id(), bank = %request.bank_transfer.bank))]
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse> {
        let started = Instant::now();
        let result: Result<ChargeResponse> = async {
            let http = self.authorized(
                self.client.post(self.url("/v2/charge")).json(request),
                self.config.charge_timeout,
            );
            let body = Self::send(http).await?;
            let response: ChargeResponse = decode(&body)?;
            require_status(&response.transaction_status)?;
            Ok(response)
        }
        .await;

        record("charge", started, &result);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "charge failed");
        }
        result
    }

    #[tracing::instrument(skip(self))]
    async fn get_status(&self, payment_id: PaymentId) -> Result<StatusResponse> {
        let started = Instant::now();
        let result: Result<StatusResponse> = async {
            let http = self.authorized(
                self.client.get(self.url(&format!("/v2/{payment_id}/status"))),
                self.config.status_timeout,
            );
            let body = Self::send(http).await?;
            let response: StatusResponse = decode(&body)?;
            require_status(&response.transaction_status)?;
            Ok(response)
        }
        .await;

        record("status", started, &result);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "status query failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_without_double_slash() {
        let client = HttpGatewayClient::new(GatewayConfig::new("http://gw.local/", "key"));
        assert_eq!(client.url("/v2/charge"), "http://gw.local/v2/charge");
    }
}
