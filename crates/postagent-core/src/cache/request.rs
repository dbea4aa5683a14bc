use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

/// Default time after which an entry is refetched.
const DEFAULT_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale_after(&self, max_age: Duration) -> bool {
        Utc::now() - self.cached_at > max_age
    }
}

/// In-memory cache for page data, keyed by query key.
///
/// Values are stored as JSON so one cache can hold every response type.
pub struct RequestCache {
    entries: Mutex<HashMap<String, CachedData<serde_json::Value>>>,
    stale_after: Duration,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestCache {
    pub fn new() -> Self {
        Self::with_stale_after(Duration::minutes(DEFAULT_STALE_MINUTES))
    }

    pub fn with_stale_after(stale_after: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stale_after,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CachedData<serde_json::Value>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value for `key`, fresh or stale. `None` if missing or if it
    /// does not decode as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let cached = self.entries().get(key).cloned()?;
        match serde_json::from_value(cached.data) {
            Ok(data) => Some(CachedData {
                data,
                cached_at: cached.cached_at,
            }),
            Err(e) => {
                debug!(key, error = %e, "Cached value has a different shape");
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        let value = serde_json::to_value(data)?;
        self.entries().insert(key.to_string(), CachedData::new(value));
        Ok(())
    }

    pub fn is_fresh(&self, key: &str) -> bool {
        self.entries()
            .get(key)
            .map(|cached| !cached.is_stale_after(self.stale_after))
            .unwrap_or(false)
    }

    /// Return the cached value if fresh, otherwise run `fetch` and cache the result.
    ///
    /// Fetch errors are returned as-is and leave any previous entry in place.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if self.is_fresh(key) {
            if let Some(cached) = self.get::<T>(key) {
                debug!(key, "Request cache hit");
                return Ok(cached.data);
            }
        }

        debug!(key, "Request cache miss");
        let data = fetch().await?;
        if let Err(e) = self.put(key, &data) {
            warn!(key, error = %e, "Failed to cache response");
        }
        Ok(data)
    }

    pub fn age_display(&self, key: &str) -> Option<String> {
        self.entries().get(key).map(|cached| cached.age_display())
    }

    pub fn invalidate(&self, key: &str) {
        self.entries().remove(key);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_age_display_rounding() {
        let mut cached = CachedData::new(());
        cached.cached_at = Utc::now() - Duration::minutes(12);
        assert_eq!(cached.age_display(), "12m ago");

        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");

        cached.cached_at = Utc::now() - Duration::minutes(70);
        assert_eq!(cached.age_display(), "1h ago");

        cached.cached_at = Utc::now() - Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");
    }

    #[test]
    fn test_put_and_get() {
        let cache = RequestCache::new();
        assert!(cache.is_empty());

        cache.put("posts", &vec!["a", "b"]).unwrap();
        let cached: CachedData<Vec<String>> = cache.get("posts").unwrap();
        assert_eq!(cached.data, vec!["a", "b"]);
        assert!(cache.is_fresh("posts"));

        // Wrong type reads as a miss
        assert!(cache.get::<i64>("posts").is_none());
    }

    #[test]
    fn test_staleness() {
        let cache = RequestCache::with_stale_after(Duration::zero());
        cache.put("k", &1).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(!cache.is_fresh("k"));
        assert!(!cache.is_fresh("missing"));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = RequestCache::new();
        cache.put("a", &1).unwrap();
        cache.put("b", &2).unwrap();
        cache.invalidate("a");
        assert!(cache.get::<i64>("a").is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_get_or_fetch_memoizes() {
        let cache = RequestCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<String, String> = cache
                .get_or_fetch("auth/me", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("alex".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "alex");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_error_is_not_cached() {
        let cache = RequestCache::new();
        let result: Result<i64, &str> = cache.get_or_fetch("k", || async { Err("offline") }).await;
        assert_eq!(result.unwrap_err(), "offline");
        assert!(cache.is_empty());
    }
}
