/// Session resolution with a read-through cache
///
/// [`SessionResolver`] turns a session token into a [`Principal`]. The cache
/// is consulted first and trusted on a hit; on a miss the session ledger is
/// joined with the identities table and the result is written back with a
/// bounded TTL.
///
/// ```text
/// token ──digest──> session:{digest} ──hit──> Principal
///                        │
///                      miss
///                        ▼
///             ledger ⋈ live identities ──> Principal ──SET EX──> cache
/// ```
///
/// The cache is advisory. Read failures and undecodable values count as a
/// miss; write and delete failures are logged and swallowed. Anything that
/// changes cached fields must call [`SessionResolver::evict_identity`] so
/// the next resolution goes back to the ledger.
///
/// A fill races with revocations: a logout can land between the ledger
/// read and the cache write. Every fill therefore re-reads the ledger after
/// writing and drops the entry if the snapshot no longer matches. Together
/// with revocation evicting after its ledger write, a stale snapshot never
/// outlives the fill that wrote it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::token::{digest_token, is_session_token};
use crate::models::identity::Principal;
use crate::store::{SessionLedger, StoreError};

pub mod memory;

pub use memory::MemorySessionCache;

/// Session cache errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command
    #[error("Session cache backend error: {0}")]
    Backend(String),
}

/// Key-value store for serialized principals
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Cache key for a token digest
pub fn cache_key(token_hash: &str) -> String {
    format!("session:{}", token_hash)
}

/// Read-through resolver over a [`SessionCache`] and a [`SessionLedger`]
#[derive(Clone)]
pub struct SessionResolver {
    cache: Arc<dyn SessionCache>,
    ledger: Arc<dyn SessionLedger>,
    ttl: Duration,
}

impl SessionResolver {
    pub fn new(cache: Arc<dyn SessionCache>, ledger: Arc<dyn SessionLedger>, ttl: Duration) -> Self {
        Self { cache, ledger, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolves a plaintext token
    ///
    /// # Returns
    ///
    /// - `Ok(Some(principal))` from the cache or the ledger
    /// - `Ok(None)` if the token is malformed, unknown, revoked, or belongs
    ///   to a deleted identity
    ///
    /// # Errors
    ///
    /// Only ledger failures surface; cache failures never do
    pub async fn resolve(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        if !is_session_token(token) {
            return Ok(None);
        }

        let token_hash = digest_token(token);
        let key = cache_key(&token_hash);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Principal>(&raw) {
                Ok(principal) => {
                    tracing::trace!(identity_id = %principal.id, "Session cache hit");
                    return Ok(Some(principal));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Undecodable session cache entry, treating as miss");
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Session cache read failed, falling back to ledger");
            }
        }

        let principal = self.ledger.resolve_session(&token_hash).await?;

        if let Some(principal) = &principal {
            tracing::debug!(identity_id = %principal.id, "Session resolved from ledger");
            self.fill(&token_hash, principal).await?;
        }

        Ok(principal)
    }

    /// Caches a ledger snapshot, then drops it again if the ledger moved on
    async fn fill(&self, token_hash: &str, principal: &Principal) -> Result<(), StoreError> {
        if !self.remember(token_hash, principal).await {
            return Ok(());
        }

        let current = self.ledger.resolve_session(token_hash).await?;
        if current.as_ref() != Some(principal) {
            tracing::debug!(identity_id = %principal.id, "Session changed during cache fill, evicting");
            self.forget(token_hash).await;
        }

        Ok(())
    }

    /// Writes a snapshot into the cache, best-effort
    ///
    /// Returns whether the entry was written.
    pub async fn remember(&self, token_hash: &str, principal: &Principal) -> bool {
        let raw = match serde_json::to_string(principal) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode session snapshot");
                return false;
            }
        };

        match self.cache.set(&cache_key(token_hash), &raw, self.ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    identity_id = %principal.id,
                    error = %e,
                    "Session cache write failed"
                );
                false
            }
        }
    }

    /// Drops one cached session, best-effort
    pub async fn forget(&self, token_hash: &str) {
        if let Err(e) = self.cache.delete(&cache_key(token_hash)).await {
            tracing::warn!(error = %e, "Session cache eviction failed");
        }
    }

    /// Drops every cached session of an identity
    ///
    /// Ledger rows are untouched, so the sessions stay valid and resolve
    /// fresh data on next use.
    ///
    /// # Returns
    ///
    /// Number of sessions the identity holds
    pub async fn evict_identity(&self, identity_id: Uuid) -> Result<usize, StoreError> {
        let hashes = self.ledger.session_hashes(identity_id).await?;

        for token_hash in &hashes {
            self.forget(token_hash).await;
        }

        tracing::debug!(identity_id = %identity_id, sessions = hashes.len(), "Evicted cached sessions");
        Ok(hashes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::identity::{NewIdentity, Role};
    use crate::store::{CredentialStore, MemoryStore};

    const TOKEN: &str = "tf_AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const UNKNOWN: &str = "tf_BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
    const CACHED: &str = "tf_CCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCCC";

    struct BrokenCache;

    #[async_trait]
    impl SessionCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    async fn store_with_session(token: &str) -> (Arc<MemoryStore>, Principal) {
        let store = Arc::new(MemoryStore::new());
        let identity = store
            .create_identity(NewIdentity {
                email: "alice@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
                verification_code: "code".to_string(),
            })
            .await
            .unwrap();
        store.record_session(&digest_token(token), identity.id).await.unwrap();
        (store, identity.principal())
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("abc"), "session:abc");
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        let (store, principal) = store_with_session(TOKEN).await;
        let cache = Arc::new(MemorySessionCache::new());
        let resolver = SessionResolver::new(cache.clone(), store, Duration::from_secs(60));

        let resolved = resolver.resolve(TOKEN).await.unwrap();
        assert_eq!(resolved, Some(principal.clone()));

        let cached = cache.get(&cache_key(&digest_token(TOKEN))).await.unwrap();
        let cached: Principal = serde_json::from_str(&cached.unwrap()).unwrap();
        assert_eq!(cached, principal);
    }

    #[tokio::test]
    async fn test_hit_is_trusted_without_ledger() {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemorySessionCache::new());
        let principal = Principal {
            id: Uuid::new_v4(),
            email: "cached@example.com".to_string(),
            role: Role::Admin,
            verified: true,
            photo: None,
            created_at: chrono::Utc::now(),
        };
        cache
            .set(
                &cache_key(&digest_token(CACHED)),
                &serde_json::to_string(&principal).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let resolver = SessionResolver::new(cache, store, Duration::from_secs(60));
        assert_eq!(resolver.resolve(CACHED).await.unwrap(), Some(principal));
    }

    #[tokio::test]
    async fn test_garbage_cache_entry_falls_back_to_ledger() {
        let (store, principal) = store_with_session(TOKEN).await;
        let cache = Arc::new(MemorySessionCache::new());
        cache
            .set(&cache_key(&digest_token(TOKEN)), "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let resolver = SessionResolver::new(cache, store, Duration::from_secs(60));
        assert_eq!(resolver.resolve(TOKEN).await.unwrap(), Some(principal));
    }

    #[tokio::test]
    async fn test_broken_cache_does_not_fail_resolution() {
        let (store, principal) = store_with_session(TOKEN).await;
        let resolver = SessionResolver::new(Arc::new(BrokenCache), store.clone(), Duration::from_secs(60));

        assert_eq!(resolver.resolve(TOKEN).await.unwrap(), Some(principal.clone()));
        assert_eq!(resolver.evict_identity(principal.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_unknown_tokens() {
        let (store, _) = store_with_session(TOKEN).await;
        let resolver =
            SessionResolver::new(Arc::new(MemorySessionCache::new()), store, Duration::from_secs(60));

        assert_eq!(resolver.resolve("").await.unwrap(), None);
        assert_eq!(resolver.resolve("tf_short").await.unwrap(), None);
        assert_eq!(resolver.resolve(UNKNOWN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evict_identity_clears_cache() {
        let (store, principal) = store_with_session(TOKEN).await;
        let cache = Arc::new(MemorySessionCache::new());
        let resolver = SessionResolver::new(cache.clone(), store, Duration::from_secs(60));

        resolver.resolve(TOKEN).await.unwrap();
        assert_eq!(cache.len(), 1);

        resolver.evict_identity(principal.id).await.unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_malformed_token_never_reads_cache() {
        let (store, principal) = store_with_session(TOKEN).await;
        let cache = Arc::new(MemorySessionCache::new());
        cache
            .set(
                &cache_key(&digest_token("tf_short")),
                &serde_json::to_string(&principal).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let resolver = SessionResolver::new(cache, store, Duration::from_secs(60));
        assert_eq!(resolver.resolve("tf_short").await.unwrap(), None);
    }

    /// Memory cache whose writes land late
    struct LateWriteCache {
        inner: MemorySessionCache,
        delay: Duration,
    }

    #[async_trait]
    impl SessionCache for LateWriteCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            tokio::time::sleep(self.delay).await;
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_revocation_during_fill_is_not_cached() {
        let (store, principal) = store_with_session(TOKEN).await;
        let cache = Arc::new(LateWriteCache {
            inner: MemorySessionCache::new(),
            delay: Duration::from_millis(100),
        });
        let resolver = SessionResolver::new(cache.clone(), store.clone(), Duration::from_secs(60));

        let inflight = tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve(TOKEN).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let token_hash = digest_token(TOKEN);
        assert!(store.revoke_session(&token_hash).await.unwrap());
        resolver.forget(&token_hash).await;

        // Started before the revocation, so it may still see the session
        assert_eq!(inflight.await.unwrap().unwrap(), Some(principal));

        assert!(cache.inner.is_empty());
        assert_eq!(resolver.resolve(TOKEN).await.unwrap(), None);
    }
}
