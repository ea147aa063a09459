use async_trait::async_trait;
use common::{EventId, PaymentId, TicketNumber, TransactionStatus, UserId};

use crate::{Event, Order, PaymentIntent, Reservation, Result, UserProfile};

/// Largest page size a listing will return.
pub const MAX_PAGE_SIZE: u64 = 100;

/// One-based page selection for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    /// Creates a page request. `size` is capped at [`MAX_PAGE_SIZE`].
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.min(MAX_PAGE_SIZE),
        }
    }

    /// Number of records to skip, or `None` when the page lies beyond any
    /// offset a backend can address (`i64::MAX`).
    pub fn offset(&self) -> Option<u64> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.size)
            .filter(|offset| i64::try_from(*offset).is_ok())
    }
}

/// A page of records plus the total count matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Held reservations, keyed by ticket number.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Finds a reservation by ticket number within an event.
    async fn find_by_ticket_and_event(
        &self,
        ticket_number: &TicketNumber,
        event_id: &EventId,
    ) -> Result<Option<Reservation>>;

    /// Sets the payment status tag of a reservation.
    ///
    /// Fails with `NotFound` if no reservation has this ticket number.
    async fn update_status(
        &self,
        ticket_number: &TicketNumber,
        status: &TransactionStatus,
    ) -> Result<()>;
}

/// Payment intents and orders.
///
/// Implementations must reject a second valid intent for the same ticket and a
/// second order for the same ticket or payment with [`StoreError::Duplicate`].
///
/// [`StoreError::Duplicate`]: crate::StoreError::Duplicate
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Finds the valid intent for a ticket, if any.
    async fn find_active_intent_by_ticket(
        &self,
        ticket_number: &TicketNumber,
    ) -> Result<Option<PaymentIntent>>;

    /// Finds an intent by id regardless of validity.
    async fn find_intent_by_id(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>>;

    /// Finds the order for a ticket, if one exists.
    async fn find_order_by_ticket(&self, ticket_number: &TicketNumber) -> Result<Option<Order>>;

    /// Lists a user's intents, newest first.
    async fn list_intents_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<PaymentIntent>>;

    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()>;

    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Records a new transaction status on an intent.
    async fn update_intent_status(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()>;

    /// Records a terminal status and clears the validity flag, releasing the
    /// ticket for a new intent.
    async fn invalidate_intent(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()>;
}

/// Read-only event reference data.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<Event>>;
}

/// Authoritative user profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>>;
}
