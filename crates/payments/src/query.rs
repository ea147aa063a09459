//! Query Service: read-only payment views.

use chrono::{DateTime, FixedOffset};
use common::{PaymentId, TicketNumber, TransactionStatus, UserId};
use serde::Serialize;
use store::{PageRequest, PaymentIntent};

use crate::error::{PaymentError, Result};
use crate::Collaborators;

/// Minute-precision format of the max-wait display value.
const MAX_WAIT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Ledger record merged with the gateway's live status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentStatusView {
    pub payment_id: PaymentId,
    pub ticket_number: TicketNumber,
    pub bank: String,
    pub va_number: String,
    /// Gross amount as currently reported by the gateway.
    pub amount: String,
    pub payment_status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    pub ticket_number: TicketNumber,
    pub full_name: String,
    pub ticket_type: String,
    pub bank: String,
    pub va_number: String,
    pub amount: String,
    pub event_name: String,
    pub country: String,
    pub place: String,
    pub order_time: DateTime<FixedOffset>,
    /// Deadline for paying a pending intent; absent once it is no longer payable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub payment_id: PaymentId,
    pub ticket_number: TicketNumber,
    pub ticket_type: String,
    pub amount: String,
    pub payment_status: TransactionStatus,
    pub is_valid: bool,
}

impl From<&PaymentIntent> for PaymentSummary {
    fn from(intent: &PaymentIntent) -> Self {
        Self {
            payment_id: intent.payment_id,
            ticket_number: intent.ticket.ticket_number.clone(),
            ticket_type: intent.ticket.ticket_type.clone(),
            amount: intent.gateway.gross_amount.clone(),
            payment_status: intent.status().clone(),
            is_valid: intent.is_valid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u64,
    /// Items on this page.
    pub count: u64,
    pub total_page: u64,
    pub total_data: u64,
}

impl PageMeta {
    pub fn new(page: PageRequest, count: u64, total: u64) -> Self {
        Self {
            page: page.page,
            count,
            total_page: total.div_ceil(page.size.max(1)),
            total_data: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentList {
    pub items: Vec<PaymentSummary>,
    pub meta: PageMeta,
}

/// Read-only projections over the ledger, reference data and gateway.
#[derive(Clone)]
pub struct QueryService {
    deps: Collaborators,
    display_offset: FixedOffset,
}

impl QueryService {
    /// `display_offset` is the zone used for human-readable timestamps.
    pub fn new(deps: Collaborators, display_offset: FixedOffset) -> Self {
        Self {
            deps,
            display_offset,
        }
    }

    async fn intent(&self, payment_id: PaymentId) -> Result<PaymentIntent> {
        self.deps
            .ledger
            .find_intent_by_id(payment_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound("payment not found".to_string()))
    }

    /// Returns the payment with its status re-read from the gateway.
    #[tracing::instrument(skip(self))]
    pub async fn payment_status(&self, payment_id: PaymentId) -> Result<PaymentStatusView> {
        let intent = self.intent(payment_id).await?;
        let live = self.deps.gateway.get_status(payment_id).await?;
        let (bank, va_number) = intent
            .settlement_account()
            .map(|va| (va.bank.clone(), va.va_number.clone()))
            .unwrap_or_default();

        Ok(PaymentStatusView {
            payment_id,
            ticket_number: intent.ticket.ticket_number,
            bank,
            va_number,
            amount: live.gross_amount,
            payment_status: live.transaction_status,
        })
    }

    /// Returns the order view of a payment for its owner.
    ///
    /// Fails with `BadRequest` when `user_id` does not own the reservation.
    #[tracing::instrument(skip(self))]
    pub async fn order_detail(&self, payment_id: PaymentId, user_id: &UserId) -> Result<OrderDetail> {
        let intent = self.intent(payment_id).await?;
        let reservation = self
            .deps
            .reservations
            .find_by_ticket_and_event(intent.ticket_number(), &intent.ticket.event_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound("reservation not found".to_string()))?;

        if &reservation.user_id != user_id {
            return Err(PaymentError::BadRequest("user not eligible".to_string()));
        }

        let event = self
            .deps
            .events
            .find_by_id(&reservation.event_id)
            .await?
            .ok_or_else(|| PaymentError::NotFound("event not found".to_string()))?;
        let profile = self.deps.cached_profile(user_id).await?;
        let (bank, va_number) = intent
            .settlement_account()
            .map(|va| (va.bank.clone(), va.va_number.clone()))
            .unwrap_or_default();

        Ok(OrderDetail {
            ticket_number: reservation.ticket_number,
            full_name: profile.full_name,
            ticket_type: reservation.ticket_type,
            bank,
            va_number,
            amount: intent.gateway.gross_amount.clone(),
            event_name: event.name,
            country: event.country.name,
            place: event.country.place,
            order_time: reservation.updated_at.with_timezone(&self.display_offset),
            max_wait_time: max_wait_display(&intent, self.display_offset),
        })
    }

    /// Lists a user's payments, newest first.
    ///
    /// `page` and `size` must be at least 1; `size` is capped.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: &UserId, page: u64, size: u64) -> Result<PaymentList> {
        if page < 1 || size < 1 {
            return Err(PaymentError::BadRequest(
                "page and size must be at least 1".to_string(),
            ));
        }
        let request = PageRequest::new(page, size);
        if request.offset().is_none() {
            return Err(PaymentError::BadRequest("page is out of range".to_string()));
        }
        let found = self.deps.ledger.list_intents_by_user(user_id, request).await?;
        let items: Vec<PaymentSummary> = found.items.iter().map(PaymentSummary::from).collect();
        let meta = PageMeta::new(request, items.len() as u64, found.total);
        Ok(PaymentList { items, meta })
    }
}

/// Payment deadline shown for a pending intent that is still valid.
pub fn max_wait_display(intent: &PaymentIntent, offset: FixedOffset) -> Option<String> {
    if intent.is_valid && *intent.status() == TransactionStatus::Pending {
        let deadline = intent.created_at + PaymentIntent::validity_window();
        Some(deadline.with_timezone(&offset).format(MAX_WAIT_FORMAT).to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_meta_rounds_total_pages_up() {
        let meta = PageMeta::new(PageRequest::new(2, 10), 10, 21);
        assert_eq!(meta.total_page, 3);
        assert_eq!(meta.total_data, 21);
        assert_eq!(meta.count, 10);

        let empty = PageMeta::new(PageRequest::new(1, 10), 0, 0);
        assert_eq!(empty.total_page, 0);
    }
}
