//! Data types shared by every catalog provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// Title used when a provider record carries no usable name.
pub const UNTITLED: &str = "Untitled";

/// Media category of a query or result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MediaDomain {
    /// Feature films
    #[serde(rename = "movie")]
    Film,
    /// Television series
    #[serde(rename = "tv")]
    Series,
    /// Video games
    #[serde(rename = "game")]
    Game,
    /// Books
    #[serde(rename = "book")]
    Book,
}

impl MediaDomain {
    /// Every recognized domain, in fan-out order.
    pub const ALL: [MediaDomain; 4] = [
        MediaDomain::Film,
        MediaDomain::Series,
        MediaDomain::Game,
        MediaDomain::Book,
    ];

    /// Wire tag for this domain.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaDomain::Film => "movie",
            MediaDomain::Series => "tv",
            MediaDomain::Game => "game",
            MediaDomain::Book => "book",
        }
    }
}

impl fmt::Display for MediaDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaDomain {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "film" => Ok(MediaDomain::Film),
            "tv" | "series" => Ok(MediaDomain::Series),
            "game" => Ok(MediaDomain::Game),
            "book" => Ok(MediaDomain::Book),
            _ => Err(CatalogError::UnsupportedDomain {
                domain: s.to_string(),
            }),
        }
    }
}

/// Upstream catalog a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogSource {
    /// The Movie Database (film and TV)
    #[serde(rename = "tmdb")]
    Tmdb,
    /// IGDB (games)
    #[serde(rename = "igdb")]
    Igdb,
    /// Open Library (primary books)
    #[serde(rename = "openlibrary")]
    OpenLibrary,
    /// Google Books (fallback books)
    #[serde(rename = "google_books")]
    GoogleBooks,
}

impl CatalogSource {
    /// Wire tag for this source.
    pub fn as_str(self) -> &'static str {
        match self {
            CatalogSource::Tmdb => "tmdb",
            CatalogSource::Igdb => "igdb",
            CatalogSource::OpenLibrary => "openlibrary",
            CatalogSource::GoogleBooks => "google_books",
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogSource {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "tmdb" => Ok(CatalogSource::Tmdb),
            "igdb" => Ok(CatalogSource::Igdb),
            "openlibrary" => Ok(CatalogSource::OpenLibrary),
            "google_books" => Ok(CatalogSource::GoogleBooks),
            other => Err(CatalogError::InvalidQuery {
                reason: format!("unknown source '{other}'"),
            }),
        }
    }
}

/// Provider-agnostic catalog record returned to every caller.
///
/// Built once from a single upstream record and never mutated afterwards.
/// `(source, external_id)` identifies the item; ids are not unique across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalItem {
    /// Media domain, as requested by the caller for shared providers
    #[serde(rename = "type")]
    pub domain: MediaDomain,
    /// Provider the record came from
    pub source: CatalogSource,
    /// Provider-native identifier, always stringified
    pub external_id: String,
    /// Display title, never empty
    pub title: String,
    /// Summary or first sentence
    pub description: Option<String>,
    /// Release date at whatever granularity the provider reports
    pub release_date: Option<String>,
    /// Absolute HTTPS artwork URL
    pub poster_url: Option<String>,
    /// Untouched provider document
    #[serde(rename = "payload")]
    pub raw_payload: serde_json::Value,
}

impl CanonicalItem {
    /// Stable key for deduplicating items from the same provider.
    pub fn key(&self) -> String {
        format!("{}:{}", self.source, self.external_id)
    }
}
