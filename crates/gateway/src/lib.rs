//! Gateway Client Adapter
//!
//! Two operations against the payment processor: a bank-transfer charge and a
//! transaction status query. [`HttpGatewayClient`] talks to the real gateway;
//! [`InMemoryGateway`] is a scriptable stand-in for tests.

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod wire;

use async_trait::async_trait;
use common::PaymentId;

pub use client::HttpGatewayClient;
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use memory::InMemoryGateway;
pub use wire::{
    BankTransfer, ChargeRequest, ChargeResponse, CustomerDetails, ItemDetails, PaymentAmount,
    StatusResponse, TransactionDetails, VaNumber,
};

/// Payment processor operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a bank-transfer charge. The request's order id is the payment id.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse>;

    /// Fetches the authoritative status of a charge.
    async fn get_status(&self, payment_id: PaymentId) -> Result<StatusResponse>;
}
