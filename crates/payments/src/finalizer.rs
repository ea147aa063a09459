//! Order Finalizer.

use chrono::Utc;
use common::{OrderId, PaymentId, TransactionStatus};
use store::{Event, Order, PaymentIntent, Reservation, UserProfile};

use crate::error::{PaymentError, Result};
use crate::notify::DEFAULT_NOTIFY_TOPIC;
use crate::Collaborators;

/// Success marker returned by [`OrderFinalizer::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedOrder {
    pub order_id: OrderId,
    pub payment_id: PaymentId,
}

/// Confirms settlement with the gateway and writes the paid order.
///
/// Payment intent state machine:
///
/// ```text
/// Pending ──settlement──> OrderCreated (terminal)
///    │
///    └──expire/cancel/deny/failure──> Invalidated (terminal, no order)
/// ```
///
/// The ledger, reservation and notification writes are independent; a failure
/// part-way leaves the earlier writes in place.
#[derive(Clone)]
pub struct OrderFinalizer {
    deps: Collaborators,
    topic: String,
}

fn reject(reason: &'static str, err: PaymentError) -> PaymentError {
    metrics::counter!("order_finalize_rejections_total", "reason" => reason).increment(1);
    tracing::info!(reason, error = %err, "finalize rejected");
    err
}

impl OrderFinalizer {
    pub fn new(deps: Collaborators) -> Self {
        Self::with_topic(deps, DEFAULT_NOTIFY_TOPIC)
    }

    pub fn with_topic(deps: Collaborators, topic: impl Into<String>) -> Self {
        Self {
            deps,
            topic: topic.into(),
        }
    }

    /// Finalizes the order for a payment intent.
    ///
    /// The existing-order check runs before the gateway is queried, so a
    /// repeated callback costs no external call.
    #[tracing::instrument(skip(self))]
    pub async fn finalize(&self, payment_id: PaymentId) -> Result<FinalizedOrder> {
        let intent = self
            .deps
            .ledger
            .find_intent_by_id(payment_id)
            .await?
            .filter(|intent| intent.is_valid)
            .ok_or_else(|| {
                reject(
                    "intent_not_found",
                    PaymentError::NotFound("payment not found".to_string()),
                )
            })?;

        if self
            .deps
            .ledger
            .find_order_by_ticket(intent.ticket_number())
            .await?
            .is_some()
        {
            return Err(reject(
                "order_exists",
                PaymentError::Conflict("order already exists".to_string()),
            ));
        }

        let status = self.deps.gateway.get_status(payment_id).await?.transaction_status;
        match status {
            TransactionStatus::Settlement => {}
            TransactionStatus::Pending => {
                return Err(reject(
                    "pending",
                    PaymentError::Conflict("transaction still pending".to_string()),
                ));
            }
            terminal if terminal.is_terminal_failure() => {
                self.deps.ledger.invalidate_intent(payment_id, &terminal).await?;
                tracing::info!(status = %terminal, "payment intent invalidated");
                return Err(reject(
                    "not_settled",
                    PaymentError::BadRequest("transaction not settlement".to_string()),
                ));
            }
            other => {
                tracing::warn!(status = %other, "unrecognized transaction status");
                return Err(reject(
                    "not_settled",
                    PaymentError::BadRequest("transaction not settlement".to_string()),
                ));
            }
        }

        let (reservation, event, profile) = self.load_references(&intent).await?;
        let order = build_order(&intent, &reservation, &event, &profile)?;

        self.deps.ledger.insert_order(&order).await.map_err(|e| {
            reject("order_insert_failed", PaymentError::from(e))
        })?;
        self.deps
            .ledger
            .update_intent_status(payment_id, &TransactionStatus::Settlement)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "order written but intent status not updated"))?;
        self.deps
            .reservations
            .update_status(intent.ticket_number(), &TransactionStatus::Settlement)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, "order written but reservation status not updated")
            })?;

        metrics::counter!("orders_finalized_total").increment(1);
        tracing::info!(order_id = %order.order_id, "order finalized");

        self.notify(order.order_id).await;

        Ok(FinalizedOrder {
            order_id: order.order_id,
            payment_id,
        })
    }

    /// Re-reads the reservation, event and profile from their primary stores.
    async fn load_references(
        &self,
        intent: &PaymentIntent,
    ) -> Result<(Reservation, Event, UserProfile)> {
        let reservation = self
            .deps
            .reservations
            .find_by_ticket_and_event(intent.ticket_number(), &intent.ticket.event_id)
            .await?
            .ok_or_else(|| {
                reject(
                    "reservation_not_found",
                    PaymentError::NotFound("reservation not found".to_string()),
                )
            })?;
        let event = self
            .deps
            .events
            .find_by_id(&intent.ticket.event_id)
            .await?
            .ok_or_else(|| {
                reject(
                    "event_not_found",
                    PaymentError::NotFound("event not found".to_string()),
                )
            })?;
        let profile = self
            .deps
            .users
            .find_by_id(&intent.user_id)
            .await?
            .ok_or_else(|| {
                reject(
                    "user_not_found",
                    PaymentError::NotFound("user not found".to_string()),
                )
            })?;
        Ok((reservation, event, profile))
    }

    async fn notify(&self, order_id: OrderId) {
        let payload = match serde_json::to_vec(&order_id) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "cannot encode notification");
                metrics::counter!("notifications_failed_total").increment(1);
                return;
            }
        };
        if let Err(e) = self.deps.notifier.publish(&self.topic, &payload).await {
            tracing::warn!(error = %e, topic = %self.topic, "notification not published");
            metrics::counter!("notifications_failed_total").increment(1);
        }
    }
}

/// Builds the order snapshot. Amount, bank and VA come from the intent as
/// persisted at charge time.
fn build_order(
    intent: &PaymentIntent,
    reservation: &Reservation,
    event: &Event,
    profile: &UserProfile,
) -> Result<Order> {
    let account = intent.settlement_account().ok_or_else(|| {
        PaymentError::internal(
            "payment has no virtual account",
            format!("intent {} has an empty va_numbers list", intent.payment_id),
        )
    })?;
    let now = Utc::now();
    Ok(Order {
        order_id: OrderId::new(),
        payment_id: intent.payment_id,
        user_id: intent.user_id.clone(),
        full_name: profile.full_name.clone(),
        email: profile.email.clone(),
        mobile_number: profile.mobile_number.clone(),
        bank: account.bank.clone(),
        va_number: account.va_number.clone(),
        ticket_number: intent.ticket.ticket_number.clone(),
        ticket_type: intent.ticket.ticket_type.clone(),
        ticket_id: intent.ticket.ticket_id.clone(),
        seat_number: intent.ticket.seat_number,
        queue_id: reservation.queue_id.clone(),
        event_id: event.event_id.clone(),
        event_name: event.name.clone(),
        country: event.country.clone(),
        event_date_time: event.date_time,
        description: event.description.clone(),
        tag: event.tag.clone(),
        amount: intent.ticket.price,
        payment_status: TransactionStatus::Settlement,
        order_time: reservation.updated_at,
        created_at: now,
        updated_at: now,
    })
}
