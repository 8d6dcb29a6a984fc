//! Error types for catalog aggregation.

use thiserror::Error;

use crate::types::{CatalogSource, MediaDomain};

/// Errors that can occur while querying or normalizing catalog providers.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required secret or key is not configured.
    #[error("{provider} is misconfigured: {setting} not set")]
    Misconfigured {
        /// Provider whose configuration is incomplete
        provider: CatalogSource,
        /// Name of the missing setting
        setting: &'static str,
    },

    /// Upstream provider rejected the request, was unreachable, or answered with
    /// a body that could not be read.
    #[error("{provider} {operation} failed: {reason}")]
    UpstreamFailed {
        /// Provider that failed
        provider: CatalogSource,
        /// Operation being performed (search, item fetch, token request)
        operation: &'static str,
        /// HTTP status reported by the provider, if any
        status: Option<u16>,
        /// The reason for the failure
        reason: String,
    },

    /// An id-scoped fetch returned no record.
    #[error("{provider} item '{external_id}' not found")]
    NotFound {
        /// Provider that was queried
        provider: CatalogSource,
        /// Identifier that yielded no record
        external_id: String,
    },

    /// Domain tag is not one of the recognized media domains.
    #[error("Unsupported domain: {domain}")]
    UnsupportedDomain {
        /// The unrecognized domain tag
        domain: String,
    },

    /// Domain and source cannot be combined for an item fetch.
    #[error("Unsupported type/source: {domain}/{provider}")]
    UnsupportedSource {
        /// Requested domain
        domain: MediaDomain,
        /// Requested source
        provider: CatalogSource,
    },

    /// Inbound query parameters are missing or malformed.
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        /// What was wrong with the query
        reason: String,
    },

    /// Outbound HTTP client could not be constructed.
    #[error("HTTP client setup failed: {reason}")]
    HttpClient {
        /// The reason for the failure
        reason: String,
    },

    /// Caller abandoned the operation before it completed.
    #[error("Catalog request cancelled")]
    Cancelled,
}

/// Coarse classification used by boundaries to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operator action required; not retryable.
    Misconfiguration,
    /// Provider-side failure; possibly transient.
    Upstream,
    /// Requested record does not exist.
    NotFound,
    /// Caller sent something the catalog cannot serve.
    BadRequest,
    /// Caller-initiated abort.
    Cancelled,
}

impl CatalogError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Misconfigured { .. } | Self::HttpClient { .. } => ErrorKind::Misconfiguration,
            Self::UpstreamFailed { .. } => ErrorKind::Upstream,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UnsupportedDomain { .. }
            | Self::UnsupportedSource { .. }
            | Self::InvalidQuery { .. } => ErrorKind::BadRequest,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HTTP status a boundary should report for this error.
    ///
    /// Cancellation maps to the non-standard 499 (client closed request).
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Misconfiguration => 500,
            ErrorKind::Upstream => 502,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => 400,
            ErrorKind::Cancelled => 499,
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Upstream
    }

    /// Whether this error represents a caller-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn upstream(
        provider: CatalogSource,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::UpstreamFailed {
            provider,
            operation,
            status: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn upstream_status(
        provider: CatalogSource,
        operation: &'static str,
        status: reqwest::StatusCode,
    ) -> Self {
        Self::UpstreamFailed {
            provider,
            operation,
            status: Some(status.as_u16()),
            reason: format!("HTTP {status}"),
        }
    }
}
