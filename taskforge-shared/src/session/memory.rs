/// In-process session cache with per-entry expiry
///
/// Expiry uses `tokio::time::Instant`, so tests can move time with
/// `tokio::time::pause` / `advance`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CacheError, SessionCache};

#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|(_, expires)| *expires > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> CacheError {
    CacheError::Backend("memory cache lock poisoned".to_string())
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;

        let now = Instant::now();
        let live = entries
            .get(key)
            .filter(|(_, expires)| *expires > now)
            .map(|(value, _)| value.clone());

        if live.is_none() {
            entries.remove(key);
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().map_err(poisoned)?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemorySessionCache::new();

        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));

        cache.delete("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemorySessionCache::new();
        cache.set("k", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
