//! Mediashelf Catalog - Media catalog aggregation

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Searches films, series, games and books across four upstream catalogs and
//! normalizes every hit into a single [`CanonicalItem`] shape.

pub mod cache;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod fallback;
mod normalize;
pub mod providers;
pub mod request;
pub mod service;
pub mod tracing_setup;
pub mod types;

// Re-export main types
pub use cache::{CacheKey, CacheOperation, CachedProvider, ResponseCache};
pub use config::{CatalogConfig, CredentialsConfig, HttpConfig, ProviderEndpoints, SearchLimits};
pub use credentials::{BrokerState, CachedCredential, Clock, CredentialBroker, ManualClock, SystemClock, TokenGrant};
pub use errors::{CatalogError, ErrorKind};
pub use fallback::FallbackPolicy;
pub use providers::CatalogProvider;
pub use request::{ItemRequest, SearchRequest, SearchScope};
pub use service::{CatalogAggregator, DEFAULT_FLATTEN_LIMIT, GroupedResults};
pub use types::{CanonicalItem, CatalogSource, MediaDomain};

/// Convenience type alias for Results with CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;
