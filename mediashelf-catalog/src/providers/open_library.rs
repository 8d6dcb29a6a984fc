//! Open Library adapter, the primary source for books.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogProvider, decode_record, ensure_domain, map_records, send_json};
use crate::config::ProviderEndpoints;
use crate::errors::CatalogError;
use crate::normalize::{TextField, date_string, non_empty, title_or_untitled, upgrade_to_https};
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

const WORKS_PREFIX: &str = "/works/";

/// Open Library provider; needs no credentials.
#[derive(Debug)]
pub struct OpenLibraryProvider {
    client: reqwest::Client,
    api_base: String,
    covers_base: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    docs: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: Option<String>,
    title: Option<String>,
    first_sentence: Option<TextField>,
    first_publish_year: Option<Value>,
    cover_i: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Work {
    title: Option<String>,
    description: Option<TextField>,
    first_publish_date: Option<Value>,
    #[serde(default)]
    covers: Option<Vec<Value>>,
}

/// Canonical work key for an id given with or without the `/works/` prefix.
pub(crate) fn work_key(external_id: &str) -> String {
    if external_id.starts_with(WORKS_PREFIX) {
        external_id.to_string()
    } else {
        format!("{WORKS_PREFIX}{external_id}")
    }
}

impl OpenLibraryProvider {
    /// Creates a provider returning at most `limit` search hits.
    pub fn new(client: reqwest::Client, endpoints: &ProviderEndpoints, limit: u32) -> Self {
        Self {
            client,
            api_base: endpoints.open_library.trim_end_matches('/').to_string(),
            covers_base: endpoints.open_library_covers.trim_end_matches('/').to_string(),
            limit,
        }
    }

    /// Large cover for a numeric cover id; zero and null mean no cover.
    fn cover_url(&self, cover: Option<&Value>) -> Option<String> {
        let id = match cover? {
            Value::Number(number) if number.as_f64() != Some(0.0) => number.to_string(),
            _ => return None,
        };
        Some(upgrade_to_https(format!("{}/{id}-L.jpg", self.covers_base)))
    }

    fn normalize_doc(&self, raw: Value) -> Result<Option<CanonicalItem>, CatalogError> {
        let doc: SearchDoc = decode_record(CatalogSource::OpenLibrary, "search", &raw)?;

        let Some(external_id) = non_empty(doc.key) else {
            return Ok(None);
        };

        Ok(Some(CanonicalItem {
            domain: MediaDomain::Book,
            source: CatalogSource::OpenLibrary,
            external_id,
            title: title_or_untitled([doc.title]),
            description: non_empty(doc.first_sentence.and_then(TextField::into_text)),
            release_date: date_string(doc.first_publish_year.as_ref()),
            poster_url: self.cover_url(doc.cover_i.as_ref()),
            raw_payload: raw,
        }))
    }

    fn normalize_work(&self, raw: Value, key: String) -> Result<CanonicalItem, CatalogError> {
        let work: Work = decode_record(CatalogSource::OpenLibrary, "item fetch", &raw)?;
        let first_cover = work.covers.as_ref().and_then(|covers| covers.first());

        Ok(CanonicalItem {
            domain: MediaDomain::Book,
            source: CatalogSource::OpenLibrary,
            external_id: key,
            title: title_or_untitled([work.title]),
            description: non_empty(work.description.and_then(TextField::into_text)),
            release_date: date_string(work.first_publish_date.as_ref()),
            poster_url: self.cover_url(first_cover),
            raw_payload: raw,
        })
    }
}

#[async_trait]
impl CatalogProvider for OpenLibraryProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::OpenLibrary
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        ensure_domain(CatalogSource::OpenLibrary, domain, &[MediaDomain::Book])?;

        let url = format!(
            "{}/search.json?q={}&limit={}",
            self.api_base,
            urlencoding::encode(query),
            self.limit
        );

        tracing::debug!(query, "Searching Open Library");
        let body = send_json(CatalogSource::OpenLibrary, "search", self.client.get(&url)).await?;
        let page: SearchPage = decode_record(CatalogSource::OpenLibrary, "search", &body)?;

        map_records(
            CatalogSource::OpenLibrary,
            page.docs.unwrap_or_default(),
            |raw| self.normalize_doc(raw),
        )
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        ensure_domain(CatalogSource::OpenLibrary, domain, &[MediaDomain::Book])?;

        let key = work_key(external_id);
        let work_id = &key[WORKS_PREFIX.len()..];
        if work_id.is_empty() {
            return Err(CatalogError::InvalidQuery {
                reason: "Open Library work id is empty".to_string(),
            });
        }

        let url = format!(
            "{}{WORKS_PREFIX}{}.json",
            self.api_base,
            urlencoding::encode(work_id)
        );

        tracing::debug!(key, "Fetching Open Library work");
        let body = send_json(CatalogSource::OpenLibrary, "item fetch", self.client.get(&url)).await?;

        self.normalize_work(body, key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> OpenLibraryProvider {
        OpenLibraryProvider::new(
            reqwest::Client::new(),
            &ProviderEndpoints::with_api_base(&server.uri()),
            10,
        )
    }

    #[test]
    fn test_work_key_prefixes_bare_ids() {
        assert_eq!(work_key("OL45804W"), "/works/OL45804W");
        assert_eq!(work_key("/works/OL45804W"), "/works/OL45804W");
    }

    #[tokio::test]
    async fn test_search_maps_docs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "the hobbit"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numFound": 3,
                "docs": [
                    {
                        "key": "/works/OL27482W",
                        "title": "The Hobbit",
                        "first_sentence": ["In a hole in the ground there lived a hobbit."],
                        "first_publish_year": 1937,
                        "cover_i": 14627509
                    },
                    {
                        "key": "/works/OL1W",
                        "first_sentence": { "value": "Wrapped." },
                        "cover_i": 0
                    },
                    { "title": "No key" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = provider(&server).search(MediaDomain::Book, "the hobbit").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_id, "/works/OL27482W");
        assert_eq!(items[0].release_date.as_deref(), Some("1937"));
        assert_eq!(
            items[0].description.as_deref(),
            Some("In a hole in the ground there lived a hobbit.")
        );
        assert_eq!(
            items[0].poster_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/14627509-L.jpg")
        );
        assert_eq!(items[1].title, "Untitled");
        assert_eq!(items[1].description.as_deref(), Some("Wrapped."));
        assert!(items[1].poster_url.is_none());
    }

    #[tokio::test]
    async fn test_fetch_accepts_bare_and_prefixed_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/works/OL27482W.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "/works/OL27482W",
                "title": "The Hobbit",
                "description": { "type": "/type/text", "value": "A hobbit goes on a journey." },
                "first_publish_date": "September 21, 1937",
                "covers": [14627509, 6979861]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server);
        for id in ["OL27482W", "/works/OL27482W"] {
            let item = provider.fetch_by_id(MediaDomain::Book, id).await.unwrap();
            assert_eq!(item.external_id, "/works/OL27482W");
            assert_eq!(item.description.as_deref(), Some("A hobbit goes on a journey."));
            assert_eq!(item.release_date.as_deref(), Some("September 21, 1937"));
            assert_eq!(
                item.poster_url.as_deref(),
                Some("https://covers.openlibrary.org/b/id/14627509-L.jpg")
            );
        }
    }

    #[tokio::test]
    async fn test_missing_work_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let error = provider(&server)
            .fetch_by_id(MediaDomain::Book, "OL0W")
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            CatalogError::UpstreamFailed { status: Some(404), .. }
        ));
    }
}
