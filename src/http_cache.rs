use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const CACHE_DIR: &str = "fpl_advisor";
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub payload: T,
    pub fetched_at: u64,
    pub ttl_secs: u64,
}

impl<T> CacheRecord<T> {
    pub fn new(payload: T, ttl: Duration) -> Self {
        Self {
            payload,
            fetched_at: system_time_to_secs(SystemTime::now()).unwrap_or_default(),
            ttl_secs: ttl.as_secs(),
        }
    }

    pub fn is_fresh_at(&self, now_secs: u64) -> bool {
        now_secs.saturating_sub(self.fetched_at) < self.ttl_secs
    }

    pub fn is_fresh(&self) -> bool {
        system_time_to_secs(SystemTime::now())
            .map(|now| self.is_fresh_at(now))
            .unwrap_or(false)
    }
}

/// Without a directory the cache never hits and never writes.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: Option<PathBuf>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(dir: Option<PathBuf>, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    pub fn at_default_location(ttl: Duration) -> Self {
        Self::new(app_cache_dir(), ttl)
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    fn enabled_dir(&self) -> Option<&Path> {
        if self.ttl.is_zero() {
            return None;
        }
        self.dir.as_deref()
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.enabled_dir()?.join(file_name(key));
        let raw = fs::read_to_string(&path).ok()?;
        let record = match serde_json::from_str::<CacheRecord<T>>(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(key, %err, "discarding unreadable cache record");
                return None;
            }
        };
        if !record.is_fresh() {
            debug!(key, "cache record expired");
            return None;
        }
        debug!(key, "cache hit");
        Some(record.payload)
    }

    pub fn store<T: Serialize>(&self, key: &str, payload: &T) -> Result<()> {
        let Some(dir) = self.enabled_dir() else {
            return Ok(());
        };
        fs::create_dir_all(dir).context("create cache dir")?;
        let record = CacheRecord::new(payload, self.ttl);
        let path = dir.join(file_name(key));
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&record).context("serialize cache record")?;
        fs::write(&tmp, json).context("write cache record")?;
        fs::rename(&tmp, &path).context("swap cache record")?;
        Ok(())
    }

    /// A failed write is logged; the freshly fetched payload is still returned.
    pub fn with_cached<T, F>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(hit) = self.load::<T>(key) {
            return Ok(hit);
        }
        let payload = fetch()?;
        if let Err(err) = self.store(key, &payload) {
            warn!(key, error = %err, "cache save failed");
        }
        Ok(payload)
    }

    pub fn clear(&self) -> Result<usize> {
        let Some(dir) = self.dir.as_deref() else {
            return Ok(0);
        };
        let Ok(entries) = fs::read_dir(dir) else {
            return Ok(0);
        };
        let mut removed = 0usize;
        for entry in entries {
            let path = entry.context("read cache dir")?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path)
                    .with_context(|| format!("remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{safe}.json")
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("fpl_advisor_{tag}_{}_{nanos}", std::process::id()))
    }

    #[test]
    fn record_freshness_is_strict() {
        let record = CacheRecord {
            payload: 1u8,
            fetched_at: 1_000,
            ttl_secs: 60,
        };
        assert!(record.is_fresh_at(1_000));
        assert!(record.is_fresh_at(1_059));
        assert!(!record.is_fresh_at(1_060));
    }

    #[test]
    fn with_cached_fetches_once() {
        let dir = scratch_dir("once");
        let cache = ResponseCache::new(Some(dir.clone()), Duration::from_secs(60));
        let mut calls = 0;
        let first: Vec<u32> = cache
            .with_cached("bootstrap", || {
                calls += 1;
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        let second: Vec<u32> = cache
            .with_cached("bootstrap", || {
                calls += 1;
                Ok(vec![9])
            })
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls, 1);
        assert_eq!(cache.clear().unwrap(), 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn disabled_cache_always_fetches() {
        let cache = ResponseCache::disabled();
        let a: u32 = cache.with_cached("k", || Ok(1)).unwrap();
        let b: u32 = cache.with_cached("k", || Ok(2)).unwrap();
        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn keys_become_safe_file_names() {
        assert_eq!(file_name("entry/123/event/7"), "entry_123_event_7.json");
    }
}
