//! Request and response bodies exchanged with the gateway.
//!
//! Responses are decoded strictly: a missing required field or a wrong type is
//! a [`GatewayError::Parse`], never a silently defaulted value.

use common::{BankCode, Money, PaymentId, TransactionStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{GatewayError, Result};

pub const PAYMENT_TYPE_BANK_TRANSFER: &str = "bank_transfer";

/// `POST /v2/charge` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub payment_type: String,
    pub transaction_details: TransactionDetails,
    pub customer_details: CustomerDetails,
    pub item_details: Vec<ItemDetails>,
    pub bank_transfer: BankTransfer,
}

impl ChargeRequest {
    /// Builds a bank-transfer charge for a single ticket.
    pub fn bank_transfer(
        payment_id: PaymentId,
        amount: Money,
        bank: BankCode,
        customer: CustomerDetails,
        item: ItemDetails,
    ) -> Self {
        let va_number = customer.phone.clone();
        Self {
            payment_type: PAYMENT_TYPE_BANK_TRANSFER.to_string(),
            transaction_details: TransactionDetails {
                order_id: payment_id.to_string(),
                gross_amount: amount.rupiah(),
            },
            customer_details: customer,
            item_details: vec![item],
            bank_transfer: BankTransfer {
                bank: bank.as_str().to_string(),
                va_number,
            },
        }
    }

    pub fn order_id(&self) -> &str {
        &self.transaction_details.order_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: String,
    pub first_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub id: String,
    pub price: i64,
    pub quantity: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransfer {
    pub bank: String,
    pub va_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

/// `POST /v2/charge` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub status_code: String,
    pub transaction_id: String,
    pub gross_amount: String,
    pub payment_type: String,
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    #[serde(default)]
    pub permata_va_number: Option<String>,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    #[serde(default)]
    pub transaction_time: Option<String>,
}

impl ChargeResponse {
    /// Returns the virtual account issued for `bank`.
    ///
    /// Permata accounts come back in a dedicated field; every other bank gets
    /// the first entry of `va_numbers`.
    pub fn settlement_account(&self, bank: BankCode) -> Option<VaNumber> {
        match bank {
            BankCode::Permata => self.permata_va_number.as_ref().map(|number| VaNumber {
                bank: bank.as_str().to_string(),
                va_number: number.clone(),
            }),
            _ => self.va_numbers.first().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    pub amount: String,
    #[serde(default)]
    pub paid_at: Option<String>,
}

/// `GET /v2/{id}/status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status_code: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    pub gross_amount: String,
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub fraud_status: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    #[serde(default)]
    pub payment_amounts: Vec<PaymentAmount>,
    #[serde(default)]
    pub transaction_time: Option<String>,
    #[serde(default)]
    pub expiry_time: Option<String>,
}

/// Fields present on every gateway body, success or failure.
#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: String,
    #[serde(default)]
    status_message: Option<String>,
}

/// Decodes a gateway body, rejecting bodies whose `status_code` is not 2xx.
///
/// The gateway reports some failures (unknown transaction, invalid bank) in
/// an HTTP 200 with an error `status_code`, so the envelope is checked before
/// the full schema is applied.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::EmptyResponse);
    }
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| GatewayError::Parse(e.to_string()))?;
    if !envelope.status_code.starts_with('2') {
        return Err(GatewayError::Rejected {
            status_code: envelope.status_code,
            message: envelope.status_message.unwrap_or_default(),
        });
    }
    serde_json::from_slice(body).map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Rejects responses that carry no transaction status.
pub(crate) fn require_status(status: &TransactionStatus) -> Result<()> {
    if status.as_str().trim().is_empty() {
        return Err(GatewayError::EmptyResponse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BNI_CHARGE: &str = r#"{
        "status_code": "201",
        "status_message": "Success, Bank Transfer transaction is created",
        "transaction_id": "9aed5972-5b6a-401e-894b-a32c91ed1a3a",
        "order_id": "1466323342",
        "merchant_id": "G812785002",
        "gross_amount": "150000.00",
        "currency": "IDR",
        "payment_type": "bank_transfer",
        "transaction_time": "2024-05-01 11:00:00",
        "transaction_status": "pending",
        "va_numbers": [{"bank": "bni", "va_number": "9880001234567890"}],
        "fraud_status": "accept"
    }"#;

    #[test]
    fn charge_request_serializes_wire_fields() {
        let request = ChargeRequest::bank_transfer(
            PaymentId::new(),
            Money::from_rupiah(150_000),
            BankCode::Bni,
            CustomerDetails {
                email: "budi@example.com".to_string(),
                first_name: "Budi".to_string(),
                phone: "08119621992".to_string(),
            },
            ItemDetails {
                id: "T-1".to_string(),
                price: 150_000,
                quantity: 1,
                name: "Ticket Category VIP".to_string(),
            },
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["payment_type"], "bank_transfer");
        assert_eq!(json["transaction_details"]["gross_amount"], 150_000);
        assert_eq!(json["bank_transfer"]["bank"], "bni");
        assert_eq!(json["bank_transfer"]["va_number"], "08119621992");
        assert_eq!(json["item_details"][0]["quantity"], 1);
    }

    #[test]
    fn decode_accepts_success_body() {
        let response: ChargeResponse = decode(BNI_CHARGE.as_bytes()).unwrap();
        assert_eq!(response.transaction_status, TransactionStatus::Pending);
        assert_eq!(
            response.settlement_account(BankCode::Bni).unwrap().va_number,
            "9880001234567890"
        );
        assert!(response.settlement_account(BankCode::Permata).is_none());
    }

    #[test]
    fn decode_rejects_error_status_code_in_body() {
        let body = br#"{"status_code":"404","status_message":"Transaction doesn't exist."}"#;
        let err = decode::<StatusResponse>(body).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status_code, .. } if status_code == "404"));
    }

    #[test]
    fn decode_rejects_missing_required_fields() {
        let body = br#"{"status_code":"201","transaction_status":"pending"}"#;
        assert!(matches!(
            decode::<ChargeResponse>(body),
            Err(GatewayError::Parse(_))
        ));
    }

    #[test]
    fn decode_treats_blank_body_as_empty() {
        assert!(matches!(
            decode::<ChargeResponse>(b"  "),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[test]
    fn permata_account_comes_from_dedicated_field() {
        let mut response: ChargeResponse = decode(BNI_CHARGE.as_bytes()).unwrap();
        response.permata_va_number = Some("969639267611".to_string());
        let account = response.settlement_account(BankCode::Permata).unwrap();
        assert_eq!(account.bank, "permata");
        assert_eq!(account.va_number, "969639267611");
    }

    #[test]
    fn blank_transaction_status_is_empty_response() {
        assert!(require_status(&TransactionStatus::from("")).is_err());
        assert!(require_status(&TransactionStatus::Pending).is_ok());
    }
}
