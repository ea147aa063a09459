//! Payment Intent Creator.

use chrono::Utc;
use common::{BankCode, EventId, PaymentId, TicketNumber, TransactionStatus, UserId};
use gateway::{ChargeRequest, ChargeResponse, CustomerDetails, ItemDetails};
use store::{
    GatewaySnapshot, PaymentIntent, Reservation, StoreError, TicketSnapshot, UserProfile, VaNumber,
};

use crate::error::{PaymentError, Result};
use crate::normalize::normalize_mobile;
use crate::Collaborators;

/// Request to pay for a held reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntent {
    pub ticket_number: TicketNumber,
    pub event_id: EventId,
    pub user_id: UserId,
    /// Bank code as supplied by the caller; validated before any external call.
    pub bank: String,
}

/// Outcome of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIntent {
    pub payment_id: PaymentId,
    pub transaction_status: TransactionStatus,
}

/// Validates a reservation, charges the gateway and records the intent.
#[derive(Clone)]
pub struct PaymentIntentCreator {
    deps: Collaborators,
}

fn reject(reason: &'static str, err: PaymentError) -> PaymentError {
    metrics::counter!("payment_intent_rejections_total", "reason" => reason).increment(1);
    tracing::info!(reason, error = %err, "payment intent rejected");
    err
}

impl PaymentIntentCreator {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    /// Creates a payment intent for `cmd.ticket_number`.
    ///
    /// Fails with `BadRequest` for an unknown bank, `NotFound` when the
    /// reservation is missing, `Forbidden` when it belongs to someone else and
    /// `Conflict` when the ticket already has a valid intent. Once the gateway
    /// has charged, a failed local write is `Internal` and leaves an orphaned
    /// charge at the gateway.
    #[tracing::instrument(
        skip(self, cmd),
        fields(ticket_number = %cmd.ticket_number, user_id = %cmd.user_id, bank = %cmd.bank)
    )]
    pub async fn create(&self, cmd: CreateIntent) -> Result<CreatedIntent> {
        let bank = cmd
            .bank
            .parse::<BankCode>()
            .map_err(|e| reject("unknown_bank", PaymentError::BadRequest(e.to_string())))?;

        let reservation = self
            .deps
            .reservations
            .find_by_ticket_and_event(&cmd.ticket_number, &cmd.event_id)
            .await?
            .ok_or_else(|| {
                reject(
                    "reservation_not_found",
                    PaymentError::NotFound("reservation not found".to_string()),
                )
            })?;

        if reservation.user_id != cmd.user_id {
            return Err(reject(
                "not_owner",
                PaymentError::Forbidden("reservation belongs to another user".to_string()),
            ));
        }

        if self
            .deps
            .ledger
            .find_active_intent_by_ticket(&cmd.ticket_number)
            .await?
            .is_some()
        {
            return Err(reject(
                "active_intent_exists",
                PaymentError::Conflict("ticket already has an active payment".to_string()),
            ));
        }

        let profile = self.deps.cached_profile(&cmd.user_id).await?;
        let payment_id = PaymentId::new();
        let request = charge_request(payment_id, &reservation, bank, &profile);

        let response = self.deps.gateway.charge(&request).await?;
        let account = response.settlement_account(bank).ok_or_else(|| {
            PaymentError::internal(
                "payment gateway returned no virtual account",
                format!("bank {bank}, transaction {}", response.transaction_id),
            )
        })?;

        let intent = build_intent(payment_id, &reservation, response, account);
        self.deps
            .ledger
            .insert_intent(&intent)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => reject(
                    "active_intent_exists",
                    PaymentError::Conflict("ticket already has an active payment".to_string()),
                ),
                other => {
                    tracing::error!(
                        %payment_id,
                        error = %other,
                        "gateway charge succeeded but the payment intent was not recorded"
                    );
                    PaymentError::Internal("failed to record payment".to_string())
                }
            })?;

        metrics::counter!("payment_intents_created_total", "bank" => bank.as_str()).increment(1);
        tracing::info!(%payment_id, status = %intent.status(), "payment intent created");

        Ok(CreatedIntent {
            payment_id,
            transaction_status: intent.gateway.transaction_status,
        })
    }
}

fn charge_request(
    payment_id: PaymentId,
    reservation: &Reservation,
    bank: BankCode,
    profile: &UserProfile,
) -> ChargeRequest {
    let phone = normalize_mobile(&profile.mobile_number);
    ChargeRequest::bank_transfer(
        payment_id,
        reservation.price,
        bank,
        CustomerDetails {
            email: profile.email.clone(),
            first_name: profile.full_name.clone(),
            phone,
        },
        ItemDetails {
            id: reservation.ticket_number.to_string(),
            price: reservation.price.rupiah(),
            quantity: 1,
            name: format!("Ticket Category {}", reservation.ticket_type),
        },
    )
}

fn build_intent(
    payment_id: PaymentId,
    reservation: &Reservation,
    response: ChargeResponse,
    account: gateway::VaNumber,
) -> PaymentIntent {
    let now = Utc::now();
    PaymentIntent {
        payment_id,
        user_id: reservation.user_id.clone(),
        ticket: TicketSnapshot::from(reservation),
        gateway: GatewaySnapshot {
            status_code: response.status_code,
            transaction_id: response.transaction_id,
            gross_amount: response.gross_amount,
            payment_type: response.payment_type,
            transaction_status: response.transaction_status,
            fraud_status: response.fraud_status,
            status_message: response.status_message,
            merchant_id: response.merchant_id,
            permata_va_number: response.permata_va_number,
            va_numbers: vec![VaNumber {
                bank: account.bank,
                va_number: account.va_number,
            }],
            transaction_time: response.transaction_time,
        },
        is_valid: true,
        expiry_time: now + PaymentIntent::validity_window(),
        created_at: now,
        updated_at: now,
    }
}
