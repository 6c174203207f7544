//! Keyed store for raw weather payloads with an age-based validity window.
//!
//! Stores are fail-open: anything that prevents a read (missing file, corrupt
//! JSON, foreign key) is a miss, never an error. Only `put` can fail, and the
//! client treats that failure as a warning.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Default validity window: 15 minutes.
pub const DEFAULT_VALIDITY_SECS: u64 = 900;

/// One stored payload. Written whole, replaced whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age in whole seconds if the entry is still inside the validity window.
    ///
    /// Entries stamped in the future (clock skew) count as age zero.
    pub fn fresh_age(&self, now: DateTime<Utc>, validity_secs: u64) -> Option<u64> {
        let age = (now - self.stored_at).num_seconds().max(0) as u64;
        (age < validity_secs).then_some(age)
    }
}

/// A successful cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub payload: serde_json::Value,
    pub age_secs: u64,
}

#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Payload and its age, or `None` when absent, expired or unreadable.
    async fn get(&self, key: &str) -> Option<CacheHit>;

    /// Replace the entry for `key`, stamping it with the current time.
    async fn put(&self, key: &str, payload: &serde_json::Value) -> Result<(), WeatherError>;
}
