//! Google Books adapter, the fallback source for books.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogProvider, decode_record, ensure_domain, map_records, send_json};
use crate::config::ProviderEndpoints;
use crate::errors::CatalogError;
use crate::normalize::{date_string, non_empty, stringify_id, title_or_untitled, upgrade_to_https};
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

/// Google Books v1 volumes provider authenticated by API key.
#[derive(Debug)]
pub struct GoogleBooksProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct VolumesPage {
    #[serde(default)]
    items: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: Option<Value>,
    #[serde(rename = "volumeInfo", default)]
    volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<Value>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
}

impl GoogleBooksProvider {
    /// Creates a provider; a missing key surfaces on first use.
    pub fn new(
        client: reqwest::Client,
        endpoints: &ProviderEndpoints,
        api_key: Option<String>,
        max_results: u32,
    ) -> Self {
        Self {
            client,
            api_base: endpoints.google_books.trim_end_matches('/').to_string(),
            api_key,
            max_results,
        }
    }

    /// Whether an API key is configured.
    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, CatalogError> {
        self.api_key.as_deref().ok_or(CatalogError::Misconfigured {
            provider: CatalogSource::GoogleBooks,
            setting: "GOOGLE_BOOKS_API_KEY",
        })
    }

    fn normalize(
        raw: Value,
        fallback_id: Option<&str>,
        operation: &'static str,
    ) -> Result<Option<CanonicalItem>, CatalogError> {
        let volume: Volume = decode_record(CatalogSource::GoogleBooks, operation, &raw)?;

        let Some(external_id) =
            stringify_id(volume.id.as_ref()).or_else(|| fallback_id.map(str::to_string))
        else {
            return Ok(None);
        };

        let info = volume.volume_info.unwrap_or_default();
        let poster_url = non_empty(info.image_links.and_then(|links| links.thumbnail))
            .map(upgrade_to_https);

        Ok(Some(CanonicalItem {
            domain: MediaDomain::Book,
            source: CatalogSource::GoogleBooks,
            external_id,
            title: title_or_untitled([info.title]),
            description: non_empty(info.description),
            release_date: date_string(info.published_date.as_ref()),
            poster_url,
            raw_payload: raw,
        }))
    }
}

#[async_trait]
impl CatalogProvider for GoogleBooksProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::GoogleBooks
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        ensure_domain(CatalogSource::GoogleBooks, domain, &[MediaDomain::Book])?;
        let api_key = self.api_key()?;

        let url = format!(
            "{}/volumes?q={}&key={}&maxResults={}",
            self.api_base,
            urlencoding::encode(query),
            urlencoding::encode(api_key),
            self.max_results
        );

        tracing::debug!(query, "Searching Google Books");
        let body = send_json(CatalogSource::GoogleBooks, "search", self.client.get(&url)).await?;
        let page: VolumesPage = decode_record(CatalogSource::GoogleBooks, "search", &body)?;

        map_records(
            CatalogSource::GoogleBooks,
            page.items.unwrap_or_default(),
            |raw| Self::normalize(raw, None, "search"),
        )
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        ensure_domain(CatalogSource::GoogleBooks, domain, &[MediaDomain::Book])?;
        let api_key = self.api_key()?;

        let url = format!(
            "{}/volumes/{}?key={}",
            self.api_base,
            urlencoding::encode(external_id),
            urlencoding::encode(api_key)
        );

        tracing::debug!(external_id, "Fetching Google Books volume");
        let body = send_json(CatalogSource::GoogleBooks, "item fetch", self.client.get(&url)).await?;

        Self::normalize(body, Some(external_id), "item fetch")?.ok_or_else(|| {
            CatalogError::NotFound {
                provider: CatalogSource::GoogleBooks,
                external_id: external_id.to_string(),
            }
        })
    }
}
