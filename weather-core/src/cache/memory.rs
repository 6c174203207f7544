use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheEntry, CacheHit, CacheStore};
use crate::{
    clock::{Clock, SystemClock},
    error::WeatherError,
};

/// Process-local cache. Entries do not survive a restart.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    validity_secs: u64,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(validity_secs: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            validity_secs,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheHit> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        let age_secs = entry.fresh_age(self.clock.now(), self.validity_secs)?;

        Some(CacheHit { payload: entry.payload.clone(), age_secs })
    }

    async fn put(&self, key: &str, payload: &serde_json::Value) -> Result<(), WeatherError> {
        let entry = CacheEntry {
            key: key.to_owned(),
            payload: payload.clone(),
            stored_at: self.clock.now(),
        };
        self.entries.write().await.insert(key.to_owned(), entry);
        Ok(())
    }
}
