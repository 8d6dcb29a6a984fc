//! Mock provider implementation for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::CatalogProvider;
use crate::errors::CatalogError;
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Items(usize),
    UpstreamFailure,
    Misconfigured(&'static str),
}

/// Mock provider for testing.
///
/// Answers every search with a fixed number of synthetic items, or with a
/// fixed error, and counts how often it was called.
#[derive(Debug)]
pub struct MockProvider {
    source: CatalogSource,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Provider answering with `count` items per call.
    pub fn returning(source: CatalogSource, count: usize) -> Self {
        Self::with_behavior(source, Behavior::Items(count))
    }

    /// Provider failing every call with an upstream error.
    pub fn failing(source: CatalogSource) -> Self {
        Self::with_behavior(source, Behavior::UpstreamFailure)
    }

    /// Provider reporting a missing setting on every call.
    pub fn misconfigured(source: CatalogSource, setting: &'static str) -> Self {
        Self::with_behavior(source, Behavior::Misconfigured(setting))
    }

    fn with_behavior(source: CatalogSource, behavior: Behavior) -> Self {
        Self {
            source,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of search and fetch calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn item(&self, domain: MediaDomain, external_id: String, title: String) -> CanonicalItem {
        CanonicalItem {
            domain,
            source: self.source,
            external_id,
            title,
            description: None,
            release_date: None,
            poster_url: None,
            raw_payload: serde_json::Value::Null,
        }
    }

    fn check(&self) -> Result<usize, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Items(count) => Ok(count),
            Behavior::UpstreamFailure => Err(CatalogError::upstream(
                self.source,
                "search",
                "mock upstream failure",
            )),
            Behavior::Misconfigured(setting) => Err(CatalogError::Misconfigured {
                provider: self.source,
                setting,
            }),
        }
    }
}

#[async_trait]
impl CatalogProvider for MockProvider {
    fn source(&self) -> CatalogSource {
        self.source
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        let count = self.check()?;
        Ok((0..count)
            .map(|i| self.item(domain, format!("{}-{i}", self.source), format!("{query} #{i}")))
            .collect())
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        self.check()?;
        Ok(self.item(domain, external_id.to_string(), format!("Item {external_id}")))
    }
}
