//! Books fallback policy.
//!
//! Book searches always hit the primary library first. When the fallback is
//! enabled and the primary answers with fewer hits than the threshold, the same
//! query is re-issued against the fallback provider and its results replace the
//! primary's.

use crate::config::CatalogConfig;
use crate::errors::CatalogError;
use crate::providers::CatalogProvider;
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

/// When to replace thin primary book results with fallback results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Whether the fallback is switched on at all
    pub enabled: bool,
    /// Primary result count below which the fallback is tried
    pub threshold: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 3,
        }
    }
}

impl FallbackPolicy {
    /// Policy from the configured flag and threshold.
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            enabled: config.credentials.google_books_fallback,
            threshold: config.limits.fallback_threshold,
        }
    }

    /// Whether a primary result count should trigger the fallback.
    pub fn should_fallback(&self, primary_count: usize) -> bool {
        self.enabled && primary_count < self.threshold
    }

    /// Runs a book search under this policy.
    ///
    /// `fallback` is `None` when the fallback provider is not registered; that
    /// only becomes an error once the fallback is actually needed.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Misconfigured` - Fallback needed but not configured
    /// - `CatalogError::UpstreamFailed` - Primary or fallback request failed
    pub async fn search(
        &self,
        primary: &dyn CatalogProvider,
        fallback: Option<&dyn CatalogProvider>,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        let results = primary.search(MediaDomain::Book, query).await?;

        if !self.should_fallback(results.len()) {
            return Ok(results);
        }

        let fallback = fallback.ok_or(CatalogError::Misconfigured {
            provider: CatalogSource::GoogleBooks,
            setting: "GOOGLE_BOOKS_API_KEY",
        })?;

        tracing::info!(
            primary = %primary.source(),
            fallback = %fallback.source(),
            primary_count = results.len(),
            threshold = self.threshold,
            "Primary book results below threshold, using fallback"
        );

        fallback.search(MediaDomain::Book, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    const ENABLED: FallbackPolicy = FallbackPolicy {
        enabled: true,
        threshold: 3,
    };

    #[test]
    fn test_should_fallback_threshold() {
        assert!(ENABLED.should_fallback(0));
        assert!(ENABLED.should_fallback(2));
        assert!(!ENABLED.should_fallback(3));
        assert!(!FallbackPolicy::default().should_fallback(0));
    }

    #[tokio::test]
    async fn test_fallback_replaces_thin_results() {
        let primary = MockProvider::returning(CatalogSource::OpenLibrary, 2);
        let fallback = MockProvider::returning(CatalogSource::GoogleBooks, 4);

        let items = ENABLED.search(&primary, Some(&fallback), "dune").await.unwrap();

        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|item| item.source == CatalogSource::GoogleBooks));
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_enough_results_skip_fallback() {
        let primary = MockProvider::returning(CatalogSource::OpenLibrary, 5);
        let fallback = MockProvider::returning(CatalogSource::GoogleBooks, 4);

        let items = ENABLED.search(&primary, Some(&fallback), "dune").await.unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_fallback_only_errors_when_needed() {
        let plenty = MockProvider::returning(CatalogSource::OpenLibrary, 3);
        assert_eq!(ENABLED.search(&plenty, None, "dune").await.unwrap().len(), 3);

        let thin = MockProvider::returning(CatalogSource::OpenLibrary, 1);
        let error = ENABLED.search(&thin, None, "dune").await.unwrap_err();
        assert!(matches!(
            error,
            CatalogError::Misconfigured {
                provider: CatalogSource::GoogleBooks,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_disabled_policy_keeps_primary() {
        let primary = MockProvider::returning(CatalogSource::OpenLibrary, 0);
        let fallback = MockProvider::returning(CatalogSource::GoogleBooks, 4);

        let items = FallbackPolicy::default()
            .search(&primary, Some(&fallback), "dune")
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(fallback.calls(), 0);
    }
}
