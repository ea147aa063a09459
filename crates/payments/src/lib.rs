//! Payment orchestration.
//!
//! Turns a held reservation into a paid order:
//! 1. [`PaymentIntentCreator`] charges the gateway and records a payment intent
//! 2. [`OrderFinalizer`] confirms settlement and writes the order
//! 3. [`QueryService`] serves read-only views that blend the ledger with the
//!    gateway's live status
//!
//! Every step is awaited before the next starts; nothing runs in parallel.

pub mod error;
pub mod finalizer;
pub mod intent;
pub mod normalize;
pub mod notify;
pub mod query;

use std::sync::Arc;

use common::UserId;
use gateway::PaymentGateway;
use store::{
    CachedProfile, EventCatalog, PaymentLedger, ProfileCache, ReservationStore, UserDirectory,
    UserProfile,
};

pub use error::{ErrorKind, PaymentError, Result};
pub use finalizer::{FinalizedOrder, OrderFinalizer};
pub use intent::{CreateIntent, CreatedIntent, PaymentIntentCreator};
pub use normalize::normalize_mobile;
#[cfg(feature = "kafka")]
pub use notify::KafkaNotifier;
pub use notify::{
    DEFAULT_NOTIFY_TOPIC, InMemoryNotifier, Notifier, NotifyError, PublishedMessage,
};
pub use query::{OrderDetail, PageMeta, PaymentList, PaymentStatusView, PaymentSummary, QueryService};

/// External collaborators shared by the payment services.
#[derive(Clone)]
pub struct Collaborators {
    pub reservations: Arc<dyn ReservationStore>,
    pub ledger: Arc<dyn PaymentLedger>,
    pub events: Arc<dyn EventCatalog>,
    pub users: Arc<dyn UserDirectory>,
    pub profiles: Arc<dyn ProfileCache>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Wires every store role to one backend that implements all of them.
    pub fn from_store<S>(
        store: S,
        profiles: Arc<dyn ProfileCache>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self
    where
        S: ReservationStore + PaymentLedger + EventCatalog + UserDirectory + 'static,
    {
        let store = Arc::new(store);
        Self {
            reservations: store.clone(),
            ledger: store.clone(),
            events: store.clone(),
            users: store,
            profiles,
            gateway,
            notifier,
        }
    }

    /// Reads a user's contact data from the profile cache.
    ///
    /// A miss or an unparseable entry is an `Internal` error; there is no
    /// fallback to the user directory.
    pub(crate) async fn cached_profile(&self, user_id: &UserId) -> Result<UserProfile> {
        let raw = self
            .profiles
            .get(user_id)
            .await
            .map_err(|e| PaymentError::internal("profile cache unavailable", e))?
            .ok_or_else(|| {
                PaymentError::internal("user profile unavailable", format!("cache miss for {user_id}"))
            })?;
        let cached: CachedProfile = serde_json::from_str(&raw)
            .map_err(|e| PaymentError::internal("cannot parse cached user profile", e))?;
        Ok(cached.data)
    }
}
