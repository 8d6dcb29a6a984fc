//! Catalog aggregation service
//!
//! Routes searches and id lookups to the provider responsible for each media
//! domain, applies the books fallback policy, and fans out across all domains
//! for catalog-wide searches.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cache::{CachedProvider, ResponseCache};
use crate::config::CatalogConfig;
use crate::errors::CatalogError;
use crate::fallback::FallbackPolicy;
use crate::providers::{
    CatalogProvider, GoogleBooksProvider, IgdbProvider, OpenLibraryProvider, TmdbProvider,
};
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

/// Provider that answers text searches for each domain.
const SEARCH_ROUTES: [(MediaDomain, CatalogSource); 4] = [
    (MediaDomain::Film, CatalogSource::Tmdb),
    (MediaDomain::Series, CatalogSource::Tmdb),
    (MediaDomain::Game, CatalogSource::Igdb),
    (MediaDomain::Book, CatalogSource::OpenLibrary),
];

/// Domain/source pairings accepted by id lookups.
const FETCH_ROUTES: [(MediaDomain, CatalogSource); 5] = [
    (MediaDomain::Film, CatalogSource::Tmdb),
    (MediaDomain::Series, CatalogSource::Tmdb),
    (MediaDomain::Game, CatalogSource::Igdb),
    (MediaDomain::Book, CatalogSource::OpenLibrary),
    (MediaDomain::Book, CatalogSource::GoogleBooks),
];

/// Default number of items shown for a catalog-wide search.
pub const DEFAULT_FLATTEN_LIMIT: usize = 24;

/// Catalog aggregator over one provider per source.
#[derive(Debug, Clone)]
pub struct CatalogAggregator {
    providers: HashMap<CatalogSource, Arc<dyn CatalogProvider>>,
    fallback: FallbackPolicy,
}

/// Search results of a catalog-wide search, grouped by domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedResults {
    /// Film results
    pub movie: Vec<CanonicalItem>,
    /// Series results
    pub tv: Vec<CanonicalItem>,
    /// Game results
    pub game: Vec<CanonicalItem>,
    /// Book results
    pub book: Vec<CanonicalItem>,
}

impl GroupedResults {
    /// Results for one domain.
    pub fn get(&self, domain: MediaDomain) -> &[CanonicalItem] {
        match domain {
            MediaDomain::Film => &self.movie,
            MediaDomain::Series => &self.tv,
            MediaDomain::Game => &self.game,
            MediaDomain::Book => &self.book,
        }
    }

    fn slot(&mut self, domain: MediaDomain) -> &mut Vec<CanonicalItem> {
        match domain {
            MediaDomain::Film => &mut self.movie,
            MediaDomain::Series => &mut self.tv,
            MediaDomain::Game => &mut self.game,
            MediaDomain::Book => &mut self.book,
        }
    }

    /// Groups in film, series, game, book order.
    pub fn iter(&self) -> impl Iterator<Item = (MediaDomain, &[CanonicalItem])> {
        MediaDomain::ALL.into_iter().map(|domain| (domain, self.get(domain)))
    }

    /// Total number of items across all domains.
    pub fn total(&self) -> usize {
        self.iter().map(|(_, items)| items.len()).sum()
    }

    /// Concatenates the groups in domain order, keeping at most `limit` items.
    pub fn flatten(&self, limit: usize) -> Vec<CanonicalItem> {
        self.iter()
            .flat_map(|(_, items)| items.iter().cloned())
            .take(limit)
            .collect()
    }
}

/// Decodes a possibly percent-encoded provider id exactly once.
///
/// Every `%` must start a two-digit hex escape and the decoded bytes must be
/// UTF-8; the result must be non-empty with no surrounding whitespace.
fn decode_external_id(raw: &str) -> Result<String, CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidQuery { reason };

    let bytes = raw.as_bytes();
    for (i, _) in raw.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(invalid(format!("malformed percent-escape in external id '{raw}'")));
        }
    }

    let decoded = urlencoding::decode(raw)
        .map_err(|e| invalid(format!("external id is not valid UTF-8 after decoding: {e}")))?;

    if decoded.is_empty() {
        return Err(invalid("external id is empty".to_string()));
    }
    if decoded.trim() != decoded {
        return Err(invalid(format!("external id '{decoded}' has surrounding whitespace")));
    }

    Ok(decoded.into_owned())
}

impl CatalogAggregator {
    /// Creates an aggregator over an explicit provider set.
    ///
    /// Providers are keyed by [`CatalogProvider::source`]; a later provider
    /// with the same source replaces an earlier one.
    pub fn new(providers: Vec<Arc<dyn CatalogProvider>>, fallback: FallbackPolicy) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.source(), provider))
            .collect();

        Self { providers, fallback }
    }

    /// Creates an aggregator over the real providers.
    ///
    /// Missing credentials do not fail construction; they surface as
    /// misconfiguration errors when the affected provider is used.
    ///
    /// # Errors
    ///
    /// - `CatalogError::HttpClient` - Outbound HTTP client could not be built
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .user_agent(config.http.user_agent)
            .build()
            .map_err(|e| CatalogError::HttpClient {
                reason: e.to_string(),
            })?;

        let credentials = &config.credentials;
        let mut providers: Vec<Arc<dyn CatalogProvider>> = vec![
            Arc::new(TmdbProvider::new(
                client.clone(),
                &config.endpoints,
                credentials.tmdb_api_key.clone(),
            )),
            Arc::new(IgdbProvider::from_config(client.clone(), config)),
            Arc::new(OpenLibraryProvider::new(
                client.clone(),
                &config.endpoints,
                config.limits.open_library_limit,
            )),
            Arc::new(GoogleBooksProvider::new(
                client,
                &config.endpoints,
                credentials.google_books_api_key.clone(),
                config.limits.google_books_max_results,
            )),
        ];

        let cache_ttl = config.http.response_cache_ttl;
        if !cache_ttl.is_zero() {
            let cache = Arc::new(ResponseCache::new(
                cache_ttl,
                config.http.response_cache_capacity,
            ));
            providers = providers
                .into_iter()
                .map(|provider| -> Arc<dyn CatalogProvider> {
                    Arc::new(CachedProvider::new(provider, cache.clone()))
                })
                .collect();
        }

        tracing::debug!(
            tmdb = credentials.tmdb_api_key.is_some(),
            igdb = credentials.igdb_client_id.is_some(),
            google_books = credentials.google_books_api_key.is_some(),
            fallback = credentials.google_books_fallback,
            cache_ttl_secs = cache_ttl.as_secs(),
            "Catalog aggregator configured"
        );

        Ok(Self::new(providers, FallbackPolicy::from_config(config)))
    }

    /// Fallback policy applied to book searches.
    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback
    }

    fn provider(
        &self,
        domain: MediaDomain,
        source: CatalogSource,
    ) -> Result<&dyn CatalogProvider, CatalogError> {
        self.providers
            .get(&source)
            .map(Arc::as_ref)
            .ok_or(CatalogError::UnsupportedSource {
                domain,
                provider: source,
            })
    }

    fn search_source(domain: MediaDomain) -> CatalogSource {
        SEARCH_ROUTES
            .iter()
            .find(|(routed, _)| *routed == domain)
            .map_or(CatalogSource::OpenLibrary, |(_, source)| *source)
    }

    /// Searches the provider responsible for `domain`.
    ///
    /// Book searches go through the fallback policy.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidQuery` - Query text is blank
    /// - `CatalogError::Misconfigured` - Responsible provider lacks credentials
    /// - `CatalogError::UpstreamFailed` - Provider request failed
    pub async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery {
                reason: "search text is empty".to_string(),
            });
        }

        let primary = self.provider(domain, Self::search_source(domain))?;
        let items = if domain == MediaDomain::Book {
            let fallback = self
                .providers
                .get(&CatalogSource::GoogleBooks)
                .map(Arc::as_ref);
            self.fallback.search(primary, fallback, query).await?
        } else {
            primary.search(domain, query).await?
        };

        tracing::debug!(%domain, query, count = items.len(), "Catalog search complete");
        Ok(items)
    }

    /// Fetches one item by provider-native id.
    ///
    /// The id may arrive percent-encoded, as it does inside URLs; it is decoded
    /// once and handed to the provider verbatim, never trimmed.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidQuery` - Id is empty, has surrounding whitespace,
    ///   or is not valid percent-encoding
    /// - `CatalogError::UnsupportedSource` - Domain and source cannot be combined
    /// - `CatalogError::Misconfigured` - Provider lacks credentials
    /// - `CatalogError::UpstreamFailed` - Provider request failed
    /// - `CatalogError::NotFound` - Provider answered without a record
    pub async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        source: CatalogSource,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        if !FETCH_ROUTES.contains(&(domain, source)) {
            return Err(CatalogError::UnsupportedSource {
                domain,
                provider: source,
            });
        }

        let external_id = decode_external_id(external_id)?;

        self.provider(domain, source)?
            .fetch_by_id(domain, &external_id)
            .await
    }

    /// Searches every domain concurrently.
    ///
    /// A failing domain contributes no results and never fails the others.
    pub async fn search_all(&self, query: &str) -> GroupedResults {
        let branches = MediaDomain::ALL.into_iter().map(|domain| async move {
            let items = match self.search(domain, query).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(%domain, error = %e, "Domain search failed, treating as empty");
                    Vec::new()
                }
            };
            (domain, items)
        });

        let mut grouped = GroupedResults::default();
        for (domain, items) in join_all(branches).await {
            *grouped.slot(domain) = items;
        }

        tracing::debug!(query, total = grouped.total(), "Catalog-wide search complete");
        grouped
    }

    /// [`search`](Self::search) that stops waiting once `cancel` fires.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Cancelled` - Token fired before the search finished
    /// - Any error [`search`](Self::search) can return
    pub async fn search_cancellable(
        &self,
        domain: MediaDomain,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Self::cancelled("search")),
            result = self.search(domain, query) => result,
        }
    }

    /// [`fetch_by_id`](Self::fetch_by_id) that stops waiting once `cancel` fires.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Cancelled` - Token fired before the fetch finished
    /// - Any error [`fetch_by_id`](Self::fetch_by_id) can return
    pub async fn fetch_by_id_cancellable(
        &self,
        domain: MediaDomain,
        source: CatalogSource,
        external_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CanonicalItem, CatalogError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Self::cancelled("item fetch")),
            result = self.fetch_by_id(domain, source, external_id) => result,
        }
    }

    /// [`search_all`](Self::search_all) that stops waiting once `cancel` fires.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Cancelled` - Token fired before every domain answered
    pub async fn search_all_cancellable(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<GroupedResults, CatalogError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Self::cancelled("catalog-wide search")),
            grouped = self.search_all(query) => Ok(grouped),
        }
    }

    fn cancelled(operation: &'static str) -> CatalogError {
        tracing::debug!(operation, "Catalog request cancelled by caller");
        CatalogError::Cancelled
    }
}
