//! Catalog provider adapters.
//!
//! Each adapter owns the request shape of one upstream API and the mapping of
//! its native JSON into [`CanonicalItem`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::CatalogError;
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

pub mod google_books;
pub mod igdb;
#[cfg(test)]
pub mod mock;
pub mod open_library;
pub mod tmdb;

pub use google_books::GoogleBooksProvider;
pub use igdb::IgdbProvider;
#[cfg(test)]
pub use mock::MockProvider;
pub use open_library::OpenLibraryProvider;
pub use tmdb::TmdbProvider;

/// Trait for catalog providers.
///
/// Implementations translate a text query or a provider-native identifier into
/// canonical items. Missing credentials must be reported before any request is
/// sent.
#[async_trait]
pub trait CatalogProvider: Send + Sync + std::fmt::Debug {
    /// Tag stamped onto every item this provider returns.
    fn source(&self) -> CatalogSource;

    /// Search by free text, preserving upstream ordering.
    ///
    /// # Errors
    /// - `CatalogError::Misconfigured` - Required credential not configured
    /// - `CatalogError::UpstreamFailed` - Provider rejected or failed the request
    /// - `CatalogError::UnsupportedSource` - Provider does not serve `domain`
    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError>;

    /// Fetch exactly one record by its provider-native identifier.
    ///
    /// # Errors
    /// - `CatalogError::Misconfigured` - Required credential not configured
    /// - `CatalogError::UpstreamFailed` - Provider rejected or failed the request
    /// - `CatalogError::NotFound` - Provider answered without a record
    /// - `CatalogError::InvalidQuery` - Identifier has the wrong shape
    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError>;
}

/// Sends a request and reads the body as JSON, classifying every failure as upstream.
pub(crate) async fn send_json(
    provider: CatalogSource,
    operation: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, CatalogError> {
    // Drop URLs from transport errors; several providers carry keys in the query string
    let response = request.send().await.map_err(|e| {
        CatalogError::upstream(provider, operation, format!("HTTP request failed: {}", e.without_url()))
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(%provider, operation, %status, "Catalog provider returned an error status");
        return Err(CatalogError::upstream_status(provider, operation, status));
    }

    response.json::<Value>().await.map_err(|e| {
        CatalogError::upstream(provider, operation, format!("JSON parsing failed: {}", e.without_url()))
    })
}

/// Reads the typed view of one raw record.
pub(crate) fn decode_record<T: DeserializeOwned>(
    provider: CatalogSource,
    operation: &'static str,
    raw: &Value,
) -> Result<T, CatalogError> {
    T::deserialize(raw).map_err(|e| {
        CatalogError::upstream(provider, operation, format!("unexpected record shape: {e}"))
    })
}

/// Maps every record of a result list, skipping records without an identifier.
pub(crate) fn map_records<F>(
    provider: CatalogSource,
    records: Vec<Value>,
    mut map: F,
) -> Result<Vec<CanonicalItem>, CatalogError>
where
    F: FnMut(Value) -> Result<Option<CanonicalItem>, CatalogError>,
{
    let total = records.len();
    let mut items = Vec::with_capacity(total);
    for record in records {
        if let Some(item) = map(record)? {
            items.push(item);
        }
    }

    if items.len() < total {
        tracing::debug!(
            %provider,
            skipped = total - items.len(),
            "Skipped search records without an identifier"
        );
    }

    Ok(items)
}

/// Rejects domains a provider does not serve.
pub(crate) fn ensure_domain(
    provider: CatalogSource,
    domain: MediaDomain,
    served: &[MediaDomain],
) -> Result<(), CatalogError> {
    if served.contains(&domain) {
        Ok(())
    } else {
        Err(CatalogError::UnsupportedSource { domain, provider })
    }
}
