//! The Movie Database adapter for films and TV series.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogProvider, decode_record, ensure_domain, map_records, send_json};
use crate::config::ProviderEndpoints;
use crate::errors::CatalogError;
use crate::normalize::{non_empty, stringify_id, title_or_untitled, upgrade_to_https};
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

const SERVED: &[MediaDomain] = &[MediaDomain::Film, MediaDomain::Series];

/// TMDB v3 provider authenticated by API key.
///
/// One instance serves both films and series; the caller's domain selects the
/// endpoint family and is stamped onto every result.
#[derive(Debug)]
pub struct TmdbProvider {
    client: reqwest::Client,
    api_base: String,
    image_base: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Option<Vec<Value>>,
}

/// Fields shared by movie and TV records, search hits and details alike.
#[derive(Debug, Deserialize)]
struct TmdbRecord {
    id: Option<Value>,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
}

impl TmdbProvider {
    /// Creates a TMDB provider; a missing key surfaces on first use.
    pub fn new(
        client: reqwest::Client,
        endpoints: &ProviderEndpoints,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base: endpoints.tmdb_api.trim_end_matches('/').to_string(),
            image_base: endpoints.tmdb_images.clone(),
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, CatalogError> {
        self.api_key
            .as_deref()
            .ok_or(CatalogError::Misconfigured {
                provider: CatalogSource::Tmdb,
                setting: "TMDB_API_KEY",
            })
    }

    fn media_path(domain: MediaDomain) -> &'static str {
        match domain {
            MediaDomain::Series => "tv",
            _ => "movie",
        }
    }

    /// Maps one TMDB record; `fallback_id` covers detail documents without an `id`.
    fn normalize(
        &self,
        domain: MediaDomain,
        raw: Value,
        fallback_id: Option<&str>,
        operation: &'static str,
    ) -> Result<Option<CanonicalItem>, CatalogError> {
        let record: TmdbRecord = decode_record(CatalogSource::Tmdb, operation, &raw)?;

        let Some(external_id) =
            stringify_id(record.id.as_ref()).or_else(|| fallback_id.map(str::to_string))
        else {
            return Ok(None);
        };

        let poster_url = non_empty(record.poster_path)
            .map(|path| upgrade_to_https(format!("{}{}", self.image_base, path)));

        Ok(Some(CanonicalItem {
            domain,
            source: CatalogSource::Tmdb,
            external_id,
            title: title_or_untitled([record.title, record.name]),
            description: non_empty(record.overview),
            release_date: non_empty(record.release_date).or_else(|| non_empty(record.first_air_date)),
            poster_url,
            raw_payload: raw,
        }))
    }
}

#[async_trait]
impl CatalogProvider for TmdbProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::Tmdb
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        ensure_domain(CatalogSource::Tmdb, domain, SERVED)?;
        let api_key = self.api_key()?;

        let url = format!(
            "{}/search/{}?query={}&include_adult=false&language=en-US&page=1&api_key={}",
            self.api_base,
            Self::media_path(domain),
            urlencoding::encode(query),
            urlencoding::encode(api_key)
        );

        tracing::debug!(%domain, query, "Searching TMDB");
        let body = send_json(CatalogSource::Tmdb, "search", self.client.get(&url)).await?;
        let page: SearchPage = decode_record(CatalogSource::Tmdb, "search", &body)?;

        map_records(
            CatalogSource::Tmdb,
            page.results.unwrap_or_default(),
            |raw| self.normalize(domain, raw, None, "search"),
        )
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        ensure_domain(CatalogSource::Tmdb, domain, SERVED)?;
        let api_key = self.api_key()?;

        let url = format!(
            "{}/{}/{}?language=en-US&api_key={}",
            self.api_base,
            Self::media_path(domain),
            urlencoding::encode(external_id),
            urlencoding::encode(api_key)
        );

        tracing::debug!(%domain, external_id, "Fetching TMDB item");
        let body = send_json(CatalogSource::Tmdb, "item fetch", self.client.get(&url)).await?;

        self.normalize(domain, body, Some(external_id), "item fetch")?
            .ok_or_else(|| CatalogError::NotFound {
                provider: CatalogSource::Tmdb,
                external_id: external_id.to_string(),
            })
    }
}
