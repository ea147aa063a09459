use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{PaymentId, TransactionStatus};
use tokio::sync::RwLock;

use crate::wire::require_status;
use crate::{
    ChargeRequest, ChargeResponse, GatewayError, PaymentAmount, PaymentGateway, Result,
    StatusResponse, VaNumber,
};

#[derive(Debug, Default)]
struct State {
    charges: HashMap<String, ChargeRequest>,
    /// Accounts handed out by each charge, reported back by status queries.
    accounts: HashMap<String, Vec<VaNumber>>,
    statuses: HashMap<String, TransactionStatus>,
    charge_override: Option<ChargeResponse>,
}

/// Scriptable gateway for testing.
///
/// Charges succeed with status `pending` and a synthetic virtual account
/// unless a response is scripted with [`set_charge_response`]. Status queries
/// report whatever was last set with [`set_status`] for a payment that was
/// charged here.
///
/// [`set_charge_response`]: InMemoryGateway::set_charge_response
/// [`set_status`]: InMemoryGateway::set_status
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<State>>,
    charge_calls: Arc<AtomicUsize>,
    status_calls: Arc<AtomicUsize>,
    fail_on_charge: Arc<AtomicBool>,
    fail_on_status: Arc<AtomicBool>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `response` from every subsequent charge.
    pub async fn set_charge_response(&self, response: ChargeResponse) {
        self.state.write().await.charge_override = Some(response);
    }

    /// Sets the status reported for a payment.
    pub async fn set_status(&self, payment_id: PaymentId, status: TransactionStatus) {
        self.state
            .write()
            .await
            .statuses
            .insert(payment_id.to_string(), status);
    }

    /// Makes charges fail as if the gateway were unreachable.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.fail_on_charge.store(fail, Ordering::SeqCst);
    }

    /// Makes status queries fail as if the gateway were unreachable.
    pub fn set_fail_on_status(&self, fail: bool) {
        self.fail_on_status.store(fail, Ordering::SeqCst);
    }

    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Returns the charge request recorded for a payment.
    pub async fn charge_request(&self, payment_id: PaymentId) -> Option<ChargeRequest> {
        self.state
            .read()
            .await
            .charges
            .get(&payment_id.to_string())
            .cloned()
    }

    fn issued_accounts(response: &ChargeResponse) -> Vec<VaNumber> {
        let mut accounts = response.va_numbers.clone();
        if let Some(number) = &response.permata_va_number {
            accounts.push(VaNumber {
                bank: "permata".to_string(),
                va_number: number.clone(),
            });
        }
        accounts
    }

    fn synthetic_response(request: &ChargeRequest) -> ChargeResponse {
        let bank = request.bank_transfer.bank.clone();
        let account = format!("988{}", request.bank_transfer.va_number.trim_start_matches('0'));
        let (permata_va_number, va_numbers) = if bank == "permata" {
            (Some(account), Vec::new())
        } else {
            (
                None,
                vec![VaNumber {
                    bank,
                    va_number: account,
                }],
            )
        };
        ChargeResponse {
            status_code: "201".to_string(),
            transaction_id: format!("trx-{}", request.order_id()),
            gross_amount: format!("{}.00", request.transaction_details.gross_amount),
            payment_type: request.payment_type.clone(),
            transaction_status: TransactionStatus::Pending,
            fraud_status: Some("accept".to_string()),
            status_message: Some("Success, Bank Transfer transaction is created".to_string()),
            merchant_id: None,
            permata_va_number,
            va_numbers,
            transaction_time: None,
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse> {
        self.charge_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_charge.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }

        let mut state = self.state.write().await;
        let response = state
            .charge_override
            .clone()
            .unwrap_or_else(|| Self::synthetic_response(request));
        require_status(&response.transaction_status)?;

        state
            .charges
            .insert(request.order_id().to_string(), request.clone());
        state.accounts.insert(
            request.order_id().to_string(),
            Self::issued_accounts(&response),
        );
        state
            .statuses
            .entry(request.order_id().to_string())
            .or_insert_with(|| response.transaction_status.clone());
        Ok(response)
    }

    async fn get_status(&self, payment_id: PaymentId) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_status.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }

        let state = self.state.read().await;
        let key = payment_id.to_string();
        let (Some(status), Some(charge)) = (state.statuses.get(&key), state.charges.get(&key))
        else {
            return Err(GatewayError::Rejected {
                status_code: "404".to_string(),
                message: "Transaction doesn't exist.".to_string(),
            });
        };

        let gross_amount = format!("{}.00", charge.transaction_details.gross_amount);
        let payment_amounts = if *status == TransactionStatus::Settlement {
            vec![PaymentAmount {
                amount: gross_amount.clone(),
                paid_at: None,
            }]
        } else {
            Vec::new()
        };

        Ok(StatusResponse {
            status_code: "200".to_string(),
            transaction_id: Some(format!("trx-{key}")),
            order_id: Some(key.clone()),
            gross_amount,
            transaction_status: status.clone(),
            payment_type: Some(charge.payment_type.clone()),
            fraud_status: Some("accept".to_string()),
            status_message: None,
            va_numbers: state.accounts.get(&key).cloned().unwrap_or_default(),
            payment_amounts,
            transaction_time: None,
            expiry_time: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CustomerDetails, ItemDetails};
    use common::{BankCode, Money};

    fn request(payment_id: PaymentId, bank: BankCode) -> ChargeRequest {
        ChargeRequest::bank_transfer(
            payment_id,
            Money::from_rupiah(250_000),
            bank,
            CustomerDetails {
                email: "a@b.c".to_string(),
                first_name: "A".to_string(),
                phone: "08123".to_string(),
            },
            ItemDetails {
                id: "T-1".to_string(),
                price: 250_000,
                quantity: 1,
                name: "Ticket Category CAT1".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn charge_then_status_reflects_scripted_status() {
        let gateway = InMemoryGateway::new();
        let id = PaymentId::new();
        let response = gateway.charge(&request(id, BankCode::Bca)).await.unwrap();
        assert_eq!(response.va_numbers.len(), 1);
        assert_eq!(
            gateway.get_status(id).await.unwrap().transaction_status,
            TransactionStatus::Pending
        );

        gateway.set_status(id, TransactionStatus::Settlement).await;
        let status = gateway.get_status(id).await.unwrap();
        assert_eq!(status.transaction_status, TransactionStatus::Settlement);
        assert_eq!(status.gross_amount, "250000.00");
        assert_eq!(gateway.charge_calls(), 1);
        assert_eq!(gateway.status_calls(), 2);
    }

    #[tokio::test]
    async fn status_reports_the_account_issued_by_charge() {
        let gateway = InMemoryGateway::new();
        let id = PaymentId::new();
        let charged = gateway.charge(&request(id, BankCode::Bni)).await.unwrap();

        let status = gateway.get_status(id).await.unwrap();

        assert_eq!(status.va_numbers, charged.va_numbers);
        assert_eq!(status.va_numbers[0].va_number, "9888123");
        assert_ne!(status.va_numbers[0].va_number, "08123");

        let permata_id = PaymentId::new();
        let permata = gateway
            .charge(&request(permata_id, BankCode::Permata))
            .await
            .unwrap();
        let status = gateway.get_status(permata_id).await.unwrap();
        assert_eq!(status.va_numbers.len(), 1);
        assert_eq!(status.va_numbers[0].bank, "permata");
        assert_eq!(Some(&status.va_numbers[0].va_number), permata.permata_va_number.as_ref());
    }

    #[tokio::test]
    async fn permata_charge_uses_dedicated_field() {
        let gateway = InMemoryGateway::new();
        let response = gateway
            .charge(&request(PaymentId::new(), BankCode::Permata))
            .await
            .unwrap();
        assert!(response.permata_va_number.is_some());
        assert!(response.va_numbers.is_empty());
    }

    #[tokio::test]
    async fn unknown_payment_is_rejected() {
        let gateway = InMemoryGateway::new();
        assert!(matches!(
            gateway.get_status(PaymentId::new()).await,
            Err(GatewayError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn fault_toggles_fail_calls() {
        let gateway = InMemoryGateway::new();
        gateway.set_fail_on_charge(true);
        assert!(matches!(
            gateway.charge(&request(PaymentId::new(), BankCode::Bni)).await,
            Err(GatewayError::Transport(_))
        ));
        assert_eq!(gateway.charge_calls(), 1);
    }
}
