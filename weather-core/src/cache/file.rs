use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::fs;

use super::{CacheEntry, CacheHit, CacheStore};
use crate::{
    clock::{Clock, SystemClock},
    error::WeatherError,
};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One JSON envelope per key inside a directory.
///
/// Writes go to a uniquely named temp file that is renamed over the target, so
/// a reader sees either the previous entry or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
    validity_secs: u64,
    clock: Arc<dyn Clock>,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>, validity_secs: u64) -> Self {
        Self { dir: dir.into(), validity_secs, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Where the entry for `key` lives on disk.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }

    async fn write_atomic(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let tmp = target.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(err) = fs::write(&tmp, bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp, target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err);
        }

        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCache {
    async fn get(&self, key: &str) -> Option<CacheHit> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::debug!("Cache read failed for {}: {}", path.display(), err);
                }
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("Ignoring corrupt cache entry {}: {}", path.display(), err);
                return None;
            }
        };

        if entry.key != key {
            tracing::debug!("Cache file {} belongs to key '{}'", path.display(), entry.key);
            return None;
        }

        let age_secs = entry.fresh_age(self.clock.now(), self.validity_secs)?;
        Some(CacheHit { payload: entry.payload, age_secs })
    }

    async fn put(&self, key: &str, payload: &serde_json::Value) -> Result<(), WeatherError> {
        let path = self.path_for(key);
        let entry = CacheEntry {
            key: key.to_owned(),
            payload: payload.clone(),
            stored_at: self.clock.now(),
        };

        let to_cache_error = |source: io::Error| WeatherError::CacheWrite {
            key: key.to_owned(),
            path: path.clone(),
            source,
        };

        let bytes = serde_json::to_vec_pretty(&entry).map_err(|e| to_cache_error(e.into()))?;
        self.write_atomic(&path, &bytes).await.map_err(to_cache_error)
    }
}

/// Percent-encoded key, so no key can name a path outside the directory.
fn file_name_for(key: &str) -> String {
    format!("{}.json", urlencoding::encode(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{DateTime, Duration};
    use serde_json::json;
    use tempfile::tempdir;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"),
        ))
    }

    #[tokio::test]
    async fn put_then_get_returns_payload_with_zero_age() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 900).with_clock(manual_clock());
        let payload = json!({ "main": { "temp": 12.5 } });

        cache.put("current_Paris_none", &payload).await.unwrap();
        let hit = cache.get("current_Paris_none").await.expect("entry should be fresh");

        assert_eq!(hit.payload, payload);
        assert_eq!(hit.age_secs, 0);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_but_stays_on_disk() {
        let dir = tempdir().unwrap();
        let clock = manual_clock();
        let cache = FileCache::new(dir.path(), 900).with_clock(clock.clone());

        cache.put("forecast_Paris_FR", &json!({ "list": [] })).await.unwrap();
        clock.advance(Duration::seconds(899));
        assert_eq!(cache.get("forecast_Paris_FR").await.map(|h| h.age_secs), Some(899));

        clock.advance(Duration::seconds(1));
        assert!(cache.get("forecast_Paris_FR").await.is_none());
        assert!(cache.path_for("forecast_Paris_FR").exists());
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 900);

        std::fs::write(cache.path_for("current_Oslo_none"), b"{ not json").unwrap();

        assert!(cache.get("current_Oslo_none").await.is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_entry() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 900);

        cache.put("current_Rome_IT", &json!({ "v": 1 })).await.unwrap();
        cache.put("current_Rome_IT", &json!({ "v": 2 })).await.unwrap();

        let hit = cache.get("current_Rome_IT").await.unwrap();
        assert_eq!(hit.payload, json!({ "v": 2 }));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn put_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("data").join("cache");
        let cache = FileCache::new(&nested, 900);

        cache.put("current_Lima_PE", &json!({})).await.unwrap();

        assert!(nested.join("current_Lima_PE.json").exists());
    }

    #[tokio::test]
    async fn unwritable_directory_reports_cache_write_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let cache = FileCache::new(&blocker, 900);

        let err = cache.put("current_Kyiv_UA", &json!({})).await.unwrap_err();

        assert!(matches!(err, WeatherError::CacheWrite { ref key, .. } if key == "current_Kyiv_UA"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_puts_never_expose_a_torn_entry() {
        const ITEMS: usize = 20_000;
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), 900);

        let mut handles = Vec::new();
        for writer in 0..32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let payload = json!({ "writer": writer, "items": vec![writer; ITEMS] });
                let mut seen = Vec::new();
                for _ in 0..5 {
                    cache.put("forecast_Paris_none", &payload).await.unwrap();
                    if let Some(hit) = cache.get("forecast_Paris_none").await {
                        seen.push(hit.payload);
                    }
                }
                seen
            }));
        }

        for handle in handles {
            for payload in handle.await.unwrap() {
                let writer = payload["writer"].as_u64().expect("whole entry has a writer");
                let items = payload["items"].as_array().expect("whole entry has items");
                assert_eq!(items.len(), ITEMS);
                assert!(items.iter().all(|v| v.as_u64() == Some(writer)));
            }
        }

        let final_hit = cache.get("forecast_Paris_none").await.expect("last write is readable");
        assert_eq!(final_hit.payload["items"].as_array().map(Vec::len), Some(ITEMS));

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().filter_map(|e| e.ok()).collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].path().extension().is_some_and(|ext| ext == "json"));
    }

    #[test]
    fn file_names_cannot_escape_the_directory() {
        assert_eq!(file_name_for("current_New_York_US"), "current_New_York_US.json");
        assert_eq!(file_name_for("current_../etc_none"), "current_..%2Fetc_none.json");
        assert_eq!(file_name_for("current_a\\b_none"), "current_a%5Cb_none.json");
        assert_eq!(file_name_for("current_São_none"), "current_S%C3%A3o_none.json");
    }

    #[test]
    fn keys_differing_in_case_use_different_files() {
        let cache = FileCache::new("/tmp/weather-cache", 900);
        assert_ne!(cache.path_for("current_paris_none"), cache.path_for("current_Paris_none"));
    }
}
