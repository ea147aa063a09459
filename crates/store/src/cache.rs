//! Read-through cache of user contact data.
//!
//! The cache is populated by the profile service; this crate only reads it.
//! Entries are JSON documents shaped like [`CachedProfile`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::UserId;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::{Result, StoreError, UserProfile};

/// Key prefix under which profiles are cached.
pub const PROFILE_CACHE_PREFIX: &str = "PAYMENT-GET-PROFILE-USER";

/// Returns the cache key for a user's profile.
pub fn profile_cache_key(user_id: &UserId) -> String {
    format!("{PROFILE_CACHE_PREFIX}:{user_id}")
}

/// Envelope the profile service writes into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub data: UserProfile,
}

/// Profile cache lookups. Returns the raw serialized entry, `None` on a miss.
#[async_trait]
pub trait ProfileCache: Send + Sync {
    async fn get(&self, user_id: &UserId) -> Result<Option<String>>;
}

/// In-memory profile cache for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileCache {
    entries: Arc<RwLock<HashMap<UserId, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryProfileCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a profile in the envelope the profile service uses.
    pub fn insert_profile(&self, profile: &UserProfile) {
        let raw = serde_json::to_string(&CachedProfile {
            data: profile.clone(),
        })
        .unwrap_or_default();
        self.insert_raw(profile.user_id.clone(), raw);
    }

    /// Caches an arbitrary raw entry.
    pub fn insert_raw(&self, user_id: UserId, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(user_id, raw.into());
        }
    }

    /// Makes every lookup fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileCache for InMemoryProfileCache {
    async fn get(&self, user_id: &UserId) -> Result<Option<String>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("profile cache offline".to_string()));
        }
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("profile cache lock poisoned".to_string()))?;
        Ok(entries.get(user_id).cloned())
    }
}

/// Redis-backed profile cache.
#[derive(Clone)]
pub struct RedisProfileCache {
    conn_manager: ConnectionManager,
}

impl RedisProfileCache {
    /// Connects to Redis at `redis_url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;
        Ok(Self { conn_manager })
    }
}

#[async_trait]
impl ProfileCache for RedisProfileCache {
    async fn get(&self, user_id: &UserId) -> Result<Option<String>> {
        let mut conn = self.conn_manager.clone();
        let key = profile_cache_key(user_id);
        let value: Option<String> = conn.get(&key).await?;
        if value.is_none() {
            tracing::debug!(%key, "profile cache miss");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            user_id: UserId::new("u-1"),
            full_name: "Budi Santoso".to_string(),
            email: "budi@example.com".to_string(),
            mobile_number: "+628119621992".to_string(),
        }
    }

    #[test]
    fn cache_key_uses_profile_prefix() {
        assert_eq!(
            profile_cache_key(&UserId::new("abc")),
            "PAYMENT-GET-PROFILE-USER:abc"
        );
    }

    #[test]
    fn cached_profile_reads_profile_service_shape() {
        let raw = r#"{"data":{"user_id":"u-1","full_name":"Budi Santoso","email":"budi@example.com",
            "mobile_number":"+628119621992","nik":"3171","role":"user"}}"#;
        let cached: CachedProfile = serde_json::from_str(raw).unwrap();
        assert_eq!(cached.data, profile());
    }

    #[tokio::test]
    async fn in_memory_cache_round_trips_profiles() {
        let cache = InMemoryProfileCache::new();
        cache.insert_profile(&profile());

        let raw = cache.get(&UserId::new("u-1")).await.unwrap().unwrap();
        let cached: CachedProfile = serde_json::from_str(&raw).unwrap();
        assert_eq!(cached.data.full_name, "Budi Santoso");
        assert!(cache.get(&UserId::new("u-2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_cache_errors() {
        let cache = InMemoryProfileCache::new();
        cache.set_unavailable(true);
        assert!(matches!(
            cache.get(&UserId::new("u-1")).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
