use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{EventId, PaymentId, TicketNumber, TransactionStatus, UserId};
use tokio::sync::RwLock;

use crate::{
    Event, EventCatalog, Order, Page, PageRequest, PaymentIntent, PaymentLedger, Reservation,
    ReservationStore, Result, StoreError, UserDirectory, UserProfile,
};

#[derive(Default)]
struct State {
    reservations: HashMap<TicketNumber, Reservation>,
    events: HashMap<EventId, Event>,
    users: HashMap<UserId, UserProfile>,
    intents: Vec<PaymentIntent>,
    orders: Vec<Order>,
}

#[derive(Default)]
struct Faults {
    insert_intent: AtomicBool,
    insert_order: AtomicBool,
    update_intent_status: AtomicBool,
    update_reservation_status: AtomicBool,
}

/// In-memory implementation of every store trait, for tests and local runs.
///
/// Enforces the same uniqueness rules as the PostgreSQL schema: one valid
/// intent per ticket, one order per ticket and per payment.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    faults: Arc<Faults>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a reservation.
    pub async fn insert_reservation(&self, reservation: Reservation) {
        self.state
            .write()
            .await
            .reservations
            .insert(reservation.ticket_number.clone(), reservation);
    }

    /// Seeds a catalog event.
    pub async fn insert_event(&self, event: Event) {
        self.state
            .write()
            .await
            .events
            .insert(event.event_id.clone(), event);
    }

    /// Seeds a user profile.
    pub async fn insert_user(&self, user: UserProfile) {
        self.state
            .write()
            .await
            .users
            .insert(user.user_id.clone(), user);
    }

    /// Returns a reservation by ticket number.
    pub async fn reservation(&self, ticket_number: &TicketNumber) -> Option<Reservation> {
        self.state
            .read()
            .await
            .reservations
            .get(ticket_number)
            .cloned()
    }

    /// Returns every stored intent.
    pub async fn intents(&self) -> Vec<PaymentIntent> {
        self.state.read().await.intents.clone()
    }

    /// Returns every stored order.
    pub async fn orders(&self) -> Vec<Order> {
        self.state.read().await.orders.clone()
    }

    /// Number of ledger and reservation writes performed through the traits.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes `insert_intent` fail with `Unavailable`.
    pub fn set_fail_on_insert_intent(&self, fail: bool) {
        self.faults.insert_intent.store(fail, Ordering::SeqCst);
    }

    /// Makes `insert_order` fail with `Unavailable`.
    pub fn set_fail_on_insert_order(&self, fail: bool) {
        self.faults.insert_order.store(fail, Ordering::SeqCst);
    }

    /// Makes `update_intent_status` fail with `Unavailable`.
    pub fn set_fail_on_update_intent_status(&self, fail: bool) {
        self.faults.update_intent_status.store(fail, Ordering::SeqCst);
    }

    /// Makes reservation `update_status` fail with `Unavailable`.
    pub fn set_fail_on_update_reservation_status(&self, fail: bool) {
        self.faults
            .update_reservation_status
            .store(fail, Ordering::SeqCst);
    }

    fn check_fault(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{operation} failed")));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    async fn set_intent_status(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
        still_valid: bool,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let intent = state
            .intents
            .iter_mut()
            .find(|i| i.payment_id == payment_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "payment intent",
                key: payment_id.to_string(),
            })?;

        intent.gateway.transaction_status = status.clone();
        intent.is_valid = intent.is_valid && still_valid;
        intent.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn find_by_ticket_and_event(
        &self,
        ticket_number: &TicketNumber,
        event_id: &EventId,
    ) -> Result<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state
            .reservations
            .get(ticket_number)
            .filter(|r| &r.event_id == event_id)
            .cloned())
    }

    async fn update_status(
        &self,
        ticket_number: &TicketNumber,
        status: &TransactionStatus,
    ) -> Result<()> {
        Self::check_fault(
            &self.faults.update_reservation_status,
            "update reservation status",
        )?;

        let mut state = self.state.write().await;
        let reservation =
            state
                .reservations
                .get_mut(ticket_number)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "reservation",
                    key: ticket_number.to_string(),
                })?;

        reservation.payment_status = Some(status.clone());
        reservation.updated_at = Utc::now();
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl PaymentLedger for InMemoryStore {
    async fn find_active_intent_by_ticket(
        &self,
        ticket_number: &TicketNumber,
    ) -> Result<Option<PaymentIntent>> {
        let state = self.state.read().await;
        Ok(state
            .intents
            .iter()
            .find(|i| i.is_valid && i.ticket_number() == ticket_number)
            .cloned())
    }

    async fn find_intent_by_id(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>> {
        let state = self.state.read().await;
        Ok(state
            .intents
            .iter()
            .find(|i| i.payment_id == payment_id)
            .cloned())
    }

    async fn find_order_by_ticket(&self, ticket_number: &TicketNumber) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state
            .orders
            .iter()
            .find(|o| &o.ticket_number == ticket_number)
            .cloned())
    }

    async fn list_intents_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<PaymentIntent>> {
        let state = self.state.read().await;
        // Reverse insertion order so equal timestamps still list newest first.
        let mut intents: Vec<_> = state
            .intents
            .iter()
            .rev()
            .filter(|i| &i.user_id == user_id)
            .cloned()
            .collect();
        intents.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = intents.len() as u64;
        let items = intents
            .into_iter()
            .skip(
                page.offset()
                    .and_then(|offset| usize::try_from(offset).ok())
                    .unwrap_or(usize::MAX),
            )
            .take(page.size as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()> {
        Self::check_fault(&self.faults.insert_intent, "insert payment intent")?;

        let mut state = self.state.write().await;

        if state
            .intents
            .iter()
            .any(|i| i.payment_id == intent.payment_id)
        {
            return Err(StoreError::Duplicate {
                entity: "payment intent",
                key: intent.payment_id.to_string(),
            });
        }

        // Unique index simulation: one valid intent per ticket
        if intent.is_valid
            && state
                .intents
                .iter()
                .any(|i| i.is_valid && i.ticket_number() == intent.ticket_number())
        {
            return Err(StoreError::Duplicate {
                entity: "payment intent",
                key: intent.ticket_number().to_string(),
            });
        }

        state.intents.push(intent.clone());
        self.record_write();
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        Self::check_fault(&self.faults.insert_order, "insert order")?;

        let mut state = self.state.write().await;

        if let Some(existing) = state
            .orders
            .iter()
            .find(|o| o.ticket_number == order.ticket_number || o.payment_id == order.payment_id)
        {
            let key = if existing.ticket_number == order.ticket_number {
                order.ticket_number.to_string()
            } else {
                order.payment_id.to_string()
            };
            return Err(StoreError::Duplicate {
                entity: "order",
                key,
            });
        }

        state.orders.push(order.clone());
        self.record_write();
        Ok(())
    }

    async fn update_intent_status(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()> {
        Self::check_fault(
            &self.faults.update_intent_status,
            "update payment intent status",
        )?;
        self.set_intent_status(payment_id, status, true).await
    }

    async fn invalidate_intent(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()> {
        Self::check_fault(
            &self.faults.update_intent_status,
            "invalidate payment intent",
        )?;
        self.set_intent_status(payment_id, status, false).await
    }
}

#[async_trait]
impl EventCatalog for InMemoryStore {
    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(event_id).cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }
}
