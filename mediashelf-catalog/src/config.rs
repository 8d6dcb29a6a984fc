//! Centralized configuration for the catalog layer.
//!
//! Secrets come from the environment; endpoints and page sizes default to the
//! public provider APIs and can be overridden for tests.

use std::time::Duration;

/// Central configuration for catalog aggregation.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// Provider secrets and feature flags
    pub credentials: CredentialsConfig,
    /// Upstream base URLs
    pub endpoints: ProviderEndpoints,
    /// Page sizes and fallback threshold
    pub limits: SearchLimits,
    /// Outbound HTTP client settings
    pub http: HttpConfig,
}

/// Provider secrets and feature flags.
///
/// Empty values are treated as unset.
#[derive(Debug, Clone, Default)]
pub struct CredentialsConfig {
    /// TMDB v3 API key
    pub tmdb_api_key: Option<String>,
    /// Twitch application client id used for IGDB
    pub igdb_client_id: Option<String>,
    /// Twitch application client secret used for the client-credentials exchange
    pub igdb_client_secret: Option<String>,
    /// Pre-provisioned IGDB bearer token; skips the exchange when set
    pub igdb_access_token: Option<String>,
    /// Whether thin Open Library results may be replaced by Google Books
    pub google_books_fallback: bool,
    /// Google Books API key
    pub google_books_api_key: Option<String>,
}

/// Base URLs for every upstream endpoint.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// TMDB API root
    pub tmdb_api: String,
    /// TMDB image CDN prefix, including size segment
    pub tmdb_images: String,
    /// Twitch identity token endpoint
    pub igdb_token: String,
    /// IGDB API root
    pub igdb_api: String,
    /// IGDB image CDN prefix, including size segment
    pub igdb_images: String,
    /// Open Library root
    pub open_library: String,
    /// Open Library covers CDN prefix
    pub open_library_covers: String,
    /// Google Books API root
    pub google_books: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            tmdb_api: "https://api.themoviedb.org/3".to_string(),
            tmdb_images: "https://image.tmdb.org/t/p/w500".to_string(),
            igdb_token: "https://id.twitch.tv/oauth2/token".to_string(),
            igdb_api: "https://api.igdb.com/v4".to_string(),
            igdb_images: "https://images.igdb.com/igdb/image/upload/t_cover_big".to_string(),
            open_library: "https://openlibrary.org".to_string(),
            open_library_covers: "https://covers.openlibrary.org/b/id".to_string(),
            google_books: "https://www.googleapis.com/books/v1".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Points every API root at one server, keeping image CDNs untouched.
    ///
    /// Used by tests that serve all providers from a single mock server.
    pub fn with_api_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            tmdb_api: format!("{base}/3"),
            igdb_token: format!("{base}/oauth2/token"),
            igdb_api: format!("{base}/v4"),
            open_library: base.to_string(),
            google_books: format!("{base}/books/v1"),
            ..Self::default()
        }
    }
}

/// Page sizes and the books fallback threshold.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    /// Open Library result count below which the fallback is tried
    pub fallback_threshold: usize,
    /// IGDB `limit` clause for searches
    pub igdb_search_limit: u32,
    /// Open Library `limit` parameter
    pub open_library_limit: u32,
    /// Google Books `maxResults` parameter
    pub google_books_max_results: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            fallback_threshold: 3,
            igdb_search_limit: 20,
            open_library_limit: 10,
            google_books_max_results: 10,
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout applied to every upstream call
    pub request_timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: &'static str,
    /// How long identical searches and lookups are answered from memory; zero disables
    pub response_cache_ttl: Duration,
    /// Maximum number of cached responses
    pub response_cache_capacity: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: "mediashelf/0.1.0",
            response_cache_ttl: Duration::from_secs(60),
            response_cache_capacity: 256,
        }
    }
}

impl CatalogConfig {
    /// Creates configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary key lookup.
    ///
    /// Recognized keys: `TMDB_API_KEY`, `IGDB_CLIENT_ID`, `IGDB_CLIENT_SECRET`,
    /// `IGDB_ACCESS_TOKEN`, `CATALOG_GOOGLE_BOOKS_FALLBACK`, `GOOGLE_BOOKS_API_KEY`
    /// `MEDIASHELF_REQUEST_TIMEOUT` (seconds) and `MEDIASHELF_CACHE_TTL` (seconds,
    /// zero disables the response cache).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.credentials = CredentialsConfig {
            tmdb_api_key: secret("TMDB_API_KEY"),
            igdb_client_id: secret("IGDB_CLIENT_ID"),
            igdb_client_secret: secret("IGDB_CLIENT_SECRET"),
            igdb_access_token: secret("IGDB_ACCESS_TOKEN"),
            // Only the literal "true" enables the fallback
            google_books_fallback: lookup("CATALOG_GOOGLE_BOOKS_FALLBACK")
                .and_then(|value| value.parse().ok())
                .unwrap_or(false),
            google_books_api_key: secret("GOOGLE_BOOKS_API_KEY"),
        };

        // Zero would fail every upstream call; treat it like an unparsable value
        if let Some(seconds) = lookup("MEDIASHELF_REQUEST_TIMEOUT")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|seconds| *seconds > 0)
        {
            config.http.request_timeout = Duration::from_secs(seconds);
        }

        if let Some(seconds) = lookup("MEDIASHELF_CACHE_TTL")
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            config.http.response_cache_ttl = Duration::from_secs(seconds);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_values() {
        let config = CatalogConfig::default();

        assert_eq!(config.limits.fallback_threshold, 3);
        assert_eq!(config.limits.igdb_search_limit, 20);
        assert_eq!(config.limits.open_library_limit, 10);
        assert_eq!(config.limits.google_books_max_results, 10);
        assert_eq!(config.http.request_timeout, Duration::from_secs(30));
        assert_eq!(config.http.response_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.http.response_cache_capacity, 256);
        assert_eq!(config.endpoints.tmdb_images, "https://image.tmdb.org/t/p/w500");
        assert!(!config.credentials.google_books_fallback);
        assert!(config.credentials.tmdb_api_key.is_none());
    }

    #[test]
    fn test_lookup_reads_secrets() {
        let config = CatalogConfig::from_lookup(lookup_from(&[
            ("TMDB_API_KEY", "tmdb-key"),
            ("IGDB_CLIENT_ID", "client"),
            ("IGDB_CLIENT_SECRET", "secret"),
            ("CATALOG_GOOGLE_BOOKS_FALLBACK", "true"),
            ("GOOGLE_BOOKS_API_KEY", "books-key"),
            ("MEDIASHELF_REQUEST_TIMEOUT", "5"),
        ]));

        assert_eq!(config.credentials.tmdb_api_key.as_deref(), Some("tmdb-key"));
        assert_eq!(config.credentials.igdb_client_id.as_deref(), Some("client"));
        assert_eq!(config.credentials.igdb_client_secret.as_deref(), Some("secret"));
        assert!(config.credentials.igdb_access_token.is_none());
        assert!(config.credentials.google_books_fallback);
        assert_eq!(config.credentials.google_books_api_key.as_deref(), Some("books-key"));
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = CatalogConfig::from_lookup(lookup_from(&[
            ("TMDB_API_KEY", ""),
            ("IGDB_ACCESS_TOKEN", "   "),
        ]));

        assert!(config.credentials.tmdb_api_key.is_none());
        assert!(config.credentials.igdb_access_token.is_none());
    }

    #[test]
    fn test_fallback_flag_requires_literal_true() {
        for value in ["1", "yes", "TRUE", "on", ""] {
            let config =
                CatalogConfig::from_lookup(lookup_from(&[("CATALOG_GOOGLE_BOOKS_FALLBACK", value)]));
            assert!(!config.credentials.google_books_fallback, "{value:?} enabled fallback");
        }
    }

    #[test]
    fn test_zero_timeout_is_ignored() {
        for value in ["0", " 0 ", "abc", ""] {
            let config =
                CatalogConfig::from_lookup(lookup_from(&[("MEDIASHELF_REQUEST_TIMEOUT", value)]));
            assert_eq!(config.http.request_timeout, Duration::from_secs(30), "{value:?}");
        }
    }

    #[test]
    fn test_cache_ttl_override() {
        let config = CatalogConfig::from_lookup(lookup_from(&[("MEDIASHELF_CACHE_TTL", "0")]));
        assert_eq!(config.http.response_cache_ttl, Duration::ZERO);

        let config = CatalogConfig::from_lookup(lookup_from(&[("MEDIASHELF_CACHE_TTL", "300")]));
        assert_eq!(config.http.response_cache_ttl, Duration::from_secs(300));

        let config = CatalogConfig::from_lookup(lookup_from(&[("MEDIASHELF_CACHE_TTL", "soon")]));
        assert_eq!(config.http.response_cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_api_base_override() {
        let endpoints = ProviderEndpoints::with_api_base("http://127.0.0.1:9000/");

        assert_eq!(endpoints.tmdb_api, "http://127.0.0.1:9000/3");
        assert_eq!(endpoints.igdb_token, "http://127.0.0.1:9000/oauth2/token");
        assert_eq!(endpoints.open_library, "http://127.0.0.1:9000");
        assert_eq!(endpoints.igdb_images, ProviderEndpoints::default().igdb_images);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("MEDIASHELF_REQUEST_TIMEOUT", "12");
        }

        let config = CatalogConfig::from_env();
        assert_eq!(config.http.request_timeout, Duration::from_secs(12));

        unsafe {
            std::env::remove_var("MEDIASHELF_REQUEST_TIMEOUT");
        }
    }
}
