//! Persistence for the payment service.
//!
//! Exposes one trait per independently-owned store (reservations, payment
//! ledger, event catalog, user directory) plus the profile cache, each with an
//! in-memory implementation for tests and a production backend
//! (PostgreSQL via `sqlx`, Redis for the cache).

pub mod cache;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use cache::{
    CachedProfile, InMemoryProfileCache, PROFILE_CACHE_PREFIX, ProfileCache, RedisProfileCache,
    profile_cache_key,
};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use model::{
    Country, Event, GatewaySnapshot, Order, PaymentIntent, Reservation, TicketSnapshot,
    UserProfile, VaNumber,
};
pub use postgres::PostgresStore;
pub use store::{EventCatalog, Page, PageRequest, PaymentLedger, ReservationStore, UserDirectory};
