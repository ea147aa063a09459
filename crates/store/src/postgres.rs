use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, Money, PaymentId, TicketNumber, TransactionStatus, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Country, Event, EventCatalog, Order, Page, PageRequest, PaymentIntent, PaymentLedger,
    Reservation, ReservationStore, Result, StoreError, UserDirectory, UserProfile,
};

const UNIQUE_VALID_INTENT: &str = "unique_valid_intent_per_ticket";
const UNIQUE_ORDER_TICKET: &str = "unique_order_per_ticket";
const UNIQUE_ORDER_PAYMENT: &str = "unique_order_per_payment";

/// PostgreSQL-backed implementation of every store trait.
///
/// The two ledger invariants are held by unique indexes, so concurrent
/// duplicate inserts fail atomically with [`StoreError::Duplicate`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Inserts or replaces a reservation.
    pub async fn upsert_reservation(&self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (ticket_number, event_id, ticket_id, ticket_type, seat_number, price,
                                      user_id, queue_id, country_code, payment_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (ticket_number) DO UPDATE SET
                event_id = EXCLUDED.event_id,
                ticket_id = EXCLUDED.ticket_id,
                ticket_type = EXCLUDED.ticket_type,
                seat_number = EXCLUDED.seat_number,
                price = EXCLUDED.price,
                user_id = EXCLUDED.user_id,
                queue_id = EXCLUDED.queue_id,
                country_code = EXCLUDED.country_code,
                payment_status = EXCLUDED.payment_status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(reservation.ticket_number.as_str())
        .bind(reservation.event_id.as_str())
        .bind(&reservation.ticket_id)
        .bind(&reservation.ticket_type)
        .bind(reservation.seat_number)
        .bind(reservation.price.rupiah())
        .bind(reservation.user_id.as_str())
        .bind(&reservation.queue_id)
        .bind(&reservation.country_code)
        .bind(reservation.payment_status.as_ref().map(|s| s.as_str()))
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces a catalog event.
    pub async fn upsert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (event_id, name, date_time, country_name, country_code, city, place, description, tag)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (event_id) DO UPDATE SET
                name = EXCLUDED.name,
                date_time = EXCLUDED.date_time,
                country_name = EXCLUDED.country_name,
                country_code = EXCLUDED.country_code,
                city = EXCLUDED.city,
                place = EXCLUDED.place,
                description = EXCLUDED.description,
                tag = EXCLUDED.tag
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(&event.name)
        .bind(event.date_time)
        .bind(&event.country.name)
        .bind(&event.country.code)
        .bind(&event.country.city)
        .bind(&event.country.place)
        .bind(&event.description)
        .bind(&event.tag)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts or replaces a user profile.
    pub async fn upsert_user(&self, user: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, full_name, email, mobile_number)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                mobile_number = EXCLUDED.mobile_number
            "#,
        )
        .bind(user.user_id.as_str())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.mobile_number)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let payment_status: Option<String> = row.try_get("payment_status")?;
        Ok(Reservation {
            ticket_number: TicketNumber::new(row.try_get::<String, _>("ticket_number")?),
            event_id: EventId::new(row.try_get::<String, _>("event_id")?),
            ticket_id: row.try_get("ticket_id")?,
            ticket_type: row.try_get("ticket_type")?,
            seat_number: row.try_get("seat_number")?,
            price: Money::from_rupiah(row.try_get("price")?),
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            queue_id: row.try_get("queue_id")?,
            country_code: row.try_get("country_code")?,
            payment_status: payment_status.map(TransactionStatus::from),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_intent(row: PgRow) -> Result<PaymentIntent> {
        let document: serde_json::Value = row.try_get("document")?;
        let mut intent: PaymentIntent = serde_json::from_value(document)?;

        // Mutable fields live in their own columns
        let status: String = row.try_get("transaction_status")?;
        intent.gateway.transaction_status = TransactionStatus::from(status);
        intent.is_valid = row.try_get("is_valid")?;
        intent.updated_at = row.try_get::<DateTime<Utc>, _>("updated_at")?;
        Ok(intent)
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        Ok(serde_json::from_value(document)?)
    }

    fn row_to_event(row: PgRow) -> Result<Event> {
        Ok(Event {
            event_id: EventId::new(row.try_get::<String, _>("event_id")?),
            name: row.try_get("name")?,
            date_time: row.try_get("date_time")?,
            country: Country {
                name: row.try_get("country_name")?,
                code: row.try_get("country_code")?,
                city: row.try_get("city")?,
                place: row.try_get("place")?,
            },
            description: row.try_get("description")?,
            tag: row.try_get("tag")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<UserProfile> {
        Ok(UserProfile {
            user_id: UserId::new(row.try_get::<String, _>("user_id")?),
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            mobile_number: row.try_get("mobile_number")?,
        })
    }

    fn map_unique_violation(e: sqlx::Error, entity: &'static str, key: String) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            let key = match db_err.constraint() {
                Some(UNIQUE_VALID_INTENT | UNIQUE_ORDER_TICKET | UNIQUE_ORDER_PAYMENT) | None => key,
                Some(other) => format!("{key} ({other})"),
            };
            return StoreError::Duplicate { entity, key };
        }
        StoreError::Database(e)
    }

    async fn set_intent_status(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
        still_valid: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payment_intents
            SET transaction_status = $2, is_valid = is_valid AND $3, updated_at = NOW()
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(status.as_str())
        .bind(still_valid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "payment intent",
                key: payment_id.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn find_by_ticket_and_event(
        &self,
        ticket_number: &TicketNumber,
        event_id: &EventId,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT ticket_number, event_id, ticket_id, ticket_type, seat_number, price, user_id,
                   queue_id, country_code, payment_status, created_at, updated_at
            FROM reservations
            WHERE ticket_number = $1 AND event_id = $2
            "#,
        )
        .bind(ticket_number.as_str())
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn update_status(
        &self,
        ticket_number: &TicketNumber,
        status: &TransactionStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE reservations SET payment_status = $2, updated_at = NOW() WHERE ticket_number = $1",
        )
        .bind(ticket_number.as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "reservation",
                key: ticket_number.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentLedger for PostgresStore {
    async fn find_active_intent_by_ticket(
        &self,
        ticket_number: &TicketNumber,
    ) -> Result<Option<PaymentIntent>> {
        let row = sqlx::query(
            r#"
            SELECT document, transaction_status, is_valid, updated_at
            FROM payment_intents
            WHERE ticket_number = $1 AND is_valid
            "#,
        )
        .bind(ticket_number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_intent).transpose()
    }

    async fn find_intent_by_id(&self, payment_id: PaymentId) -> Result<Option<PaymentIntent>> {
        let row = sqlx::query(
            r#"
            SELECT document, transaction_status, is_valid, updated_at
            FROM payment_intents
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_intent).transpose()
    }

    async fn find_order_by_ticket(&self, ticket_number: &TicketNumber) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT document FROM orders WHERE ticket_number = $1")
            .bind(ticket_number.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_intents_by_user(
        &self,
        user_id: &UserId,
        page: PageRequest,
    ) -> Result<Page<PaymentIntent>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payment_intents WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        let total = total.max(0) as u64;

        let Some(offset) = page.offset() else {
            return Ok(Page {
                items: Vec::new(),
                total,
            });
        };

        let rows = sqlx::query(
            r#"
            SELECT document, transaction_status, is_valid, updated_at
            FROM payment_intents
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(page.size as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_intent)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page { items, total })
    }

    async fn insert_intent(&self, intent: &PaymentIntent) -> Result<()> {
        let document = serde_json::to_value(intent)?;

        sqlx::query(
            r#"
            INSERT INTO payment_intents (payment_id, user_id, ticket_number, transaction_status, is_valid,
                                         expiry_time, created_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(intent.payment_id.as_uuid())
        .bind(intent.user_id.as_str())
        .bind(intent.ticket_number().as_str())
        .bind(intent.status().as_str())
        .bind(intent.is_valid)
        .bind(intent.expiry_time)
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Self::map_unique_violation(e, "payment intent", intent.ticket_number().to_string())
        })?;

        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let document = serde_json::to_value(order)?;

        sqlx::query(
            r#"
            INSERT INTO orders (order_id, payment_id, ticket_number, user_id, created_at, document)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.payment_id.as_uuid())
        .bind(order.ticket_number.as_str())
        .bind(order.user_id.as_str())
        .bind(order.created_at)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_unique_violation(e, "order", order.ticket_number.to_string()))?;

        Ok(())
    }

    async fn update_intent_status(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()> {
        self.set_intent_status(payment_id, status, true).await
    }

    async fn invalidate_intent(
        &self,
        payment_id: PaymentId,
        status: &TransactionStatus,
    ) -> Result<()> {
        self.set_intent_status(payment_id, status, false).await
    }
}

#[async_trait]
impl EventCatalog for PostgresStore {
    async fn find_by_id(&self, event_id: &EventId) -> Result<Option<Event>> {
        let row = sqlx::query(
            r#"
            SELECT event_id, name, date_time, country_name, country_code, city, place, description, tag
            FROM events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_event).transpose()
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn find_by_id(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT user_id, full_name, email, mobile_number FROM users WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }
}
