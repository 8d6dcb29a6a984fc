//! Short-lived response cache in front of catalog providers.
//!
//! Identical searches and id lookups inside the TTL window are answered from
//! memory instead of reaching the upstream provider. Only successful responses
//! are cached; errors always go back upstream on the next call.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use crate::credentials::{Clock, SystemClock};
use crate::errors::CatalogError;
use crate::providers::CatalogProvider;
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

/// Which provider operation a cached response answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    /// Free-text search
    Search,
    /// Lookup by provider-native id
    Fetch,
}

/// Cache key: provider, domain, operation and the query text or id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Provider that produced the response
    pub source: CatalogSource,
    /// Requested domain; film and series share a provider
    pub domain: MediaDomain,
    /// Operation performed
    pub operation: CacheOperation,
    /// Query text for searches, external id for fetches
    pub term: String,
}

#[derive(Debug, Clone)]
enum CachedResponse {
    Search(Vec<CanonicalItem>),
    Item(CanonicalItem),
}

#[derive(Debug)]
struct CacheEntry {
    response: CachedResponse,
    created_at: DateTime<Utc>,
}

/// LRU response cache whose entries expire after a fixed TTL.
pub struct ResponseCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

impl ResponseCache {
    /// Creates a cache holding at most `capacity` responses for `ttl` each.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_clock(ttl, capacity, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock.
    pub fn with_clock(ttl: Duration, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl,
            clock,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        // A clock that went backwards yields a negative age, which still counts as fresh
        match (self.clock.now() - entry.created_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let mut entries = self.entries.lock();
        let fresh = self.is_fresh(entries.get(key)?);
        if fresh {
            entries.get(key).map(|entry| entry.response.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    fn insert(&self, key: CacheKey, response: CachedResponse) {
        let entry = CacheEntry {
            response,
            created_at: self.clock.now(),
        };
        self.entries.lock().put(key, entry);
    }
}

/// Provider decorator that consults a [`ResponseCache`] before the inner provider.
#[derive(Debug)]
pub struct CachedProvider {
    inner: Arc<dyn CatalogProvider>,
    cache: Arc<ResponseCache>,
}

impl CachedProvider {
    /// Wraps `inner`; several providers may share one cache.
    pub fn new(inner: Arc<dyn CatalogProvider>, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }

    fn key(&self, domain: MediaDomain, operation: CacheOperation, term: &str) -> CacheKey {
        CacheKey {
            source: self.inner.source(),
            domain,
            operation,
            term: term.to_string(),
        }
    }
}

#[async_trait]
impl CatalogProvider for CachedProvider {
    fn source(&self) -> CatalogSource {
        self.inner.source()
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        let key = self.key(domain, CacheOperation::Search, query);
        if let Some(CachedResponse::Search(items)) = self.cache.get(&key) {
            tracing::debug!(source = %key.source, %domain, query, "Search served from cache");
            return Ok(items);
        }

        let items = self.inner.search(domain, query).await?;
        self.cache.insert(key, CachedResponse::Search(items.clone()));
        Ok(items)
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        let key = self.key(domain, CacheOperation::Fetch, external_id);
        if let Some(CachedResponse::Item(item)) = self.cache.get(&key) {
            tracing::debug!(source = %key.source, %domain, external_id, "Item served from cache");
            return Ok(item);
        }

        let item = self.inner.fetch_by_id(domain, external_id).await?;
        self.cache.insert(key, CachedResponse::Item(item.clone()));
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::credentials::ManualClock;
    use crate::providers::MockProvider;

    fn cached(
        inner: Arc<MockProvider>,
        clock: Arc<ManualClock>,
    ) -> (CachedProvider, Arc<ResponseCache>) {
        let cache = Arc::new(ResponseCache::with_clock(Duration::from_secs(60), 16, clock));
        (CachedProvider::new(inner, cache.clone()), cache)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_identical_search_within_ttl_hits_cache() {
        let inner = Arc::new(MockProvider::returning(CatalogSource::Tmdb, 2));
        let clock = clock();
        let (provider, cache) = cached(inner.clone(), clock.clone());

        let first = provider.search(MediaDomain::Film, "alien").await.unwrap();
        clock.advance(chrono::Duration::seconds(59));
        let second = provider.search(MediaDomain::Film, "alien").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_goes_back_upstream() {
        let inner = Arc::new(MockProvider::returning(CatalogSource::Tmdb, 2));
        let clock = clock();
        let (provider, _) = cached(inner.clone(), clock.clone());

        provider.fetch_by_id(MediaDomain::Film, "603").await.unwrap();
        clock.advance(chrono::Duration::seconds(60));
        provider.fetch_by_id(MediaDomain::Film, "603").await.unwrap();

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_key_separates_domain_operation_and_term() {
        let inner = Arc::new(MockProvider::returning(CatalogSource::Tmdb, 1));
        let (provider, cache) = cached(inner.clone(), clock());

        provider.search(MediaDomain::Film, "alien").await.unwrap();
        provider.search(MediaDomain::Series, "alien").await.unwrap();
        provider.search(MediaDomain::Film, "aliens").await.unwrap();
        provider.fetch_by_id(MediaDomain::Film, "alien").await.unwrap();

        assert_eq!(inner.calls(), 4);
        assert_eq!(cache.len(), 4);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let inner = Arc::new(MockProvider::failing(CatalogSource::Igdb));
        let (provider, cache) = cached(inner.clone(), clock());

        assert!(provider.search(MediaDomain::Game, "doom").await.is_err());
        assert!(provider.search(MediaDomain::Game, "doom").await.is_err());

        assert_eq!(inner.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let inner = Arc::new(MockProvider::returning(CatalogSource::OpenLibrary, 1));
        let cache = Arc::new(ResponseCache::with_clock(Duration::from_secs(60), 2, clock()));
        let provider = CachedProvider::new(inner.clone(), cache.clone());

        for query in ["a", "b", "c", "a"] {
            provider.search(MediaDomain::Book, query).await.unwrap();
        }

        assert_eq!(cache.len(), 2);
        assert_eq!(inner.calls(), 4);
    }
}
