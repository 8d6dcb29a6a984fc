//! Parsing of inbound search and item parameters.
//!
//! Boundaries hand over raw, possibly missing, string parameters; these types
//! turn them into typed requests or a 400-class [`CatalogError`].

use crate::errors::CatalogError;
use crate::types::{CatalogSource, MediaDomain};

/// What a search should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Every domain, searched concurrently
    All,
    /// A single domain
    Domain(MediaDomain),
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Domain or catalog-wide scope
    pub scope: SearchScope,
    /// Trimmed, non-empty search text
    pub query: String,
}

/// Validated item lookup parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    /// Requested domain
    pub domain: MediaDomain,
    /// Provider that owns the id
    pub source: CatalogSource,
    /// Provider-native id exactly as received, possibly percent-encoded
    pub external_id: String,
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, CatalogError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CatalogError::InvalidQuery {
            reason: format!("missing '{name}' parameter"),
        })
}

impl SearchScope {
    /// Parses `all` or a domain tag.
    ///
    /// # Errors
    ///
    /// - `CatalogError::UnsupportedDomain` - Tag is neither `all` nor a domain
    pub fn parse(tag: &str) -> Result<Self, CatalogError> {
        if tag.trim().eq_ignore_ascii_case("all") {
            Ok(SearchScope::All)
        } else {
            tag.parse().map(SearchScope::Domain)
        }
    }
}

impl SearchRequest {
    /// Parses raw `type` and `q` parameters.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidQuery` - Parameter missing or blank
    /// - `CatalogError::UnsupportedDomain` - Unknown domain tag
    pub fn parse(scope: Option<&str>, query: Option<&str>) -> Result<Self, CatalogError> {
        let scope = SearchScope::parse(required("type", scope)?)?;
        let query = required("q", query)?.to_string();
        Ok(Self { scope, query })
    }
}

impl ItemRequest {
    /// Parses raw `type`, `source` and `externalId` parameters.
    ///
    /// # Errors
    ///
    /// - `CatalogError::InvalidQuery` - Parameter missing or unknown source
    /// - `CatalogError::UnsupportedDomain` - Unknown domain tag
    pub fn parse(
        domain: Option<&str>,
        source: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            domain: required("type", domain)?.parse()?,
            source: required("source", source)?.parse()?,
            external_id: required("externalId", external_id)?.to_string(),
        })
    }
}
