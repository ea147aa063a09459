//! Records held by the stores.

use chrono::{DateTime, Duration, Utc};
use common::{EventId, Money, OrderId, PaymentId, TicketNumber, TransactionStatus, UserId};
use serde::{Deserialize, Serialize};

/// How long a freshly created payment intent stays payable.
pub const INTENT_VALIDITY_MINUTES: i64 = 15;

/// A held ticket awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub ticket_number: TicketNumber,
    pub event_id: EventId,
    pub ticket_id: String,
    pub ticket_type: String,
    pub seat_number: i32,
    /// Price captured when the seat was held.
    pub price: Money,
    pub user_id: UserId,
    pub queue_id: String,
    pub country_code: String,
    /// Payment status tag; `None` until an order settles it.
    pub payment_status: Option<TransactionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reservation fields frozen into a payment intent at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    pub ticket_number: TicketNumber,
    pub event_id: EventId,
    pub ticket_id: String,
    pub ticket_type: String,
    pub seat_number: i32,
    pub country_code: String,
    pub price: Money,
}

impl From<&Reservation> for TicketSnapshot {
    fn from(reservation: &Reservation) -> Self {
        Self {
            ticket_number: reservation.ticket_number.clone(),
            event_id: reservation.event_id.clone(),
            ticket_id: reservation.ticket_id.clone(),
            ticket_type: reservation.ticket_type.clone(),
            seat_number: reservation.seat_number,
            country_code: reservation.country_code.clone(),
            price: reservation.price,
        }
    }
}

/// A virtual account issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

/// Gateway charge response fields frozen into a payment intent.
///
/// Only `transaction_status` changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    pub status_code: String,
    pub transaction_id: String,
    pub gross_amount: String,
    pub payment_type: String,
    pub transaction_status: TransactionStatus,
    pub fraud_status: Option<String>,
    pub status_message: Option<String>,
    pub merchant_id: Option<String>,
    pub permata_va_number: Option<String>,
    /// Exactly one entry: the settlement account for the requested bank.
    pub va_numbers: Vec<VaNumber>,
    pub transaction_time: Option<String>,
}

/// One charge attempt against the gateway for a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub ticket: TicketSnapshot,
    pub gateway: GatewaySnapshot,
    pub is_valid: bool,
    pub expiry_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Window after creation during which the intent may be paid.
    pub fn validity_window() -> Duration {
        Duration::minutes(INTENT_VALIDITY_MINUTES)
    }

    /// Returns the persisted transaction status.
    pub fn status(&self) -> &TransactionStatus {
        &self.gateway.transaction_status
    }

    /// Returns the virtual account the payer transfers to.
    pub fn settlement_account(&self) -> Option<&VaNumber> {
        self.gateway.va_numbers.first()
    }

    /// Returns the ticket number this intent pays for.
    pub fn ticket_number(&self) -> &TicketNumber {
        &self.ticket.ticket_number
    }
}

/// Location of an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
    pub city: String,
    pub place: String,
}

/// Catalog entry for a ticketed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    pub name: String,
    pub date_time: DateTime<Utc>,
    pub country: Country,
    pub description: String,
    pub tag: String,
}

/// Contact data for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub mobile_number: String,
}

/// A paid booking. Written once after settlement, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub mobile_number: String,
    pub bank: String,
    pub va_number: String,
    pub ticket_number: TicketNumber,
    pub ticket_type: String,
    pub ticket_id: String,
    pub seat_number: i32,
    pub queue_id: String,
    pub event_id: EventId,
    pub event_name: String,
    pub country: Country,
    pub event_date_time: DateTime<Utc>,
    pub description: String,
    pub tag: String,
    pub amount: Money,
    pub payment_status: TransactionStatus,
    pub order_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
