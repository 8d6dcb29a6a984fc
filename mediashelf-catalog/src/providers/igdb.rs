//! IGDB adapter for video games.
//!
//! Queries are written in IGDB's Apicalypse body syntax and sent with a Twitch
//! bearer token obtained from the [`CredentialBroker`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogProvider, decode_record, ensure_domain, map_records, send_json};
use crate::config::{CatalogConfig, ProviderEndpoints};
use crate::credentials::{CredentialBroker, TokenGrant};
use crate::errors::CatalogError;
use crate::normalize::{non_empty, stringify_id, title_or_untitled, upgrade_to_https};
use crate::types::{CanonicalItem, CatalogSource, MediaDomain};

const FIELDS: &str = "id,name,summary,first_release_date,cover.image_id";

/// IGDB v4 games provider.
#[derive(Debug)]
pub struct IgdbProvider {
    client: reqwest::Client,
    games_url: String,
    image_base: String,
    broker: BrokerSlot,
    search_limit: u32,
}

#[derive(Debug)]
enum BrokerSlot {
    Ready(Arc<CredentialBroker>),
    Missing(&'static str),
}

#[derive(Debug, Deserialize)]
struct IgdbGame {
    id: Option<Value>,
    name: Option<String>,
    summary: Option<String>,
    first_release_date: Option<Value>,
    cover: Option<Value>,
}

impl IgdbProvider {
    /// Creates a provider around an existing broker.
    pub fn new(
        client: reqwest::Client,
        endpoints: &ProviderEndpoints,
        broker: Arc<CredentialBroker>,
        search_limit: u32,
    ) -> Self {
        Self::with_slot(client, endpoints, BrokerSlot::Ready(broker), search_limit)
    }

    /// Creates a provider from configuration.
    ///
    /// Requires a client id plus either a static token or a client secret;
    /// incomplete credentials surface as misconfiguration on first use.
    pub fn from_config(client: reqwest::Client, config: &CatalogConfig) -> Self {
        let credentials = &config.credentials;
        let slot = match (
            credentials.igdb_client_id.as_ref(),
            TokenGrant::from_config(credentials),
        ) {
            (Some(client_id), Some(grant)) => BrokerSlot::Ready(Arc::new(CredentialBroker::new(
                client.clone(),
                config.endpoints.igdb_token.clone(),
                client_id.clone(),
                grant,
            ))),
            (None, _) => BrokerSlot::Missing("IGDB_CLIENT_ID"),
            (Some(_), None) => BrokerSlot::Missing("IGDB_CLIENT_SECRET"),
        };

        Self::with_slot(
            client,
            &config.endpoints,
            slot,
            config.limits.igdb_search_limit,
        )
    }

    fn with_slot(
        client: reqwest::Client,
        endpoints: &ProviderEndpoints,
        broker: BrokerSlot,
        search_limit: u32,
    ) -> Self {
        Self {
            client,
            games_url: format!("{}/games", endpoints.igdb_api.trim_end_matches('/')),
            image_base: endpoints.igdb_images.trim_end_matches('/').to_string(),
            broker,
            search_limit,
        }
    }

    /// Broker backing this provider, if credentials are complete.
    pub fn broker(&self) -> Option<&Arc<CredentialBroker>> {
        match &self.broker {
            BrokerSlot::Ready(broker) => Some(broker),
            BrokerSlot::Missing(_) => None,
        }
    }

    fn ready_broker(&self) -> Result<&CredentialBroker, CatalogError> {
        match &self.broker {
            BrokerSlot::Ready(broker) => Ok(broker),
            BrokerSlot::Missing(setting) => Err(CatalogError::Misconfigured {
                provider: CatalogSource::Igdb,
                setting,
            }),
        }
    }

    /// Apicalypse body for a text search; only double quotes are escaped.
    pub(crate) fn search_body(&self, query: &str) -> String {
        format!(
            "search \"{}\"; fields {FIELDS}; limit {};",
            query.replace('"', "\\\""),
            self.search_limit
        )
    }

    pub(crate) fn fetch_body(id: u64) -> String {
        format!("fields {FIELDS}; where id = {id}; limit 1;")
    }

    async fn query_games(
        &self,
        operation: &'static str,
        body: String,
    ) -> Result<Vec<Value>, CatalogError> {
        let broker = self.ready_broker()?;
        let token = broker.access_token().await?;

        let request = self
            .client
            .post(&self.games_url)
            .header("Client-ID", broker.client_id())
            .bearer_auth(token)
            .body(body);

        match send_json(CatalogSource::Igdb, operation, request).await? {
            Value::Array(records) => Ok(records),
            _ => Ok(Vec::new()),
        }
    }

    fn normalize(&self, raw: Value, operation: &'static str) -> Result<Option<CanonicalItem>, CatalogError> {
        let game: IgdbGame = decode_record(CatalogSource::Igdb, operation, &raw)?;

        let Some(external_id) = stringify_id(game.id.as_ref()) else {
            return Ok(None);
        };

        let poster_url = game
            .cover
            .as_ref()
            .and_then(|cover| cover.get("image_id"))
            .and_then(Value::as_str)
            .filter(|image_id| !image_id.is_empty())
            .map(|image_id| upgrade_to_https(format!("{}/{image_id}.jpg", self.image_base)));

        Ok(Some(CanonicalItem {
            domain: MediaDomain::Game,
            source: CatalogSource::Igdb,
            external_id,
            title: title_or_untitled([game.name]),
            description: non_empty(game.summary),
            release_date: game
                .first_release_date
                .as_ref()
                .and_then(Value::as_i64)
                .and_then(release_date_from_epoch),
            poster_url,
            raw_payload: raw,
        }))
    }
}

/// Calendar date (UTC) for a Unix timestamp in seconds; zero means unknown.
pub(crate) fn release_date_from_epoch(seconds: i64) -> Option<String> {
    if seconds == 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0).map(|date| date.format("%Y-%m-%d").to_string())
}

#[async_trait]
impl CatalogProvider for IgdbProvider {
    fn source(&self) -> CatalogSource {
        CatalogSource::Igdb
    }

    async fn search(
        &self,
        domain: MediaDomain,
        query: &str,
    ) -> Result<Vec<CanonicalItem>, CatalogError> {
        ensure_domain(CatalogSource::Igdb, domain, &[MediaDomain::Game])?;

        tracing::debug!(query, "Searching IGDB");
        let records = self.query_games("search", self.search_body(query)).await?;

        map_records(CatalogSource::Igdb, records, |raw| self.normalize(raw, "search"))
    }

    async fn fetch_by_id(
        &self,
        domain: MediaDomain,
        external_id: &str,
    ) -> Result<CanonicalItem, CatalogError> {
        ensure_domain(CatalogSource::Igdb, domain, &[MediaDomain::Game])?;
        self.ready_broker()?;

        let id: u64 = external_id.trim().parse().map_err(|_| CatalogError::InvalidQuery {
            reason: format!("IGDB ids are numeric, got '{external_id}'"),
        })?;

        tracing::debug!(id, "Fetching IGDB item");
        let records = self.query_games("item fetch", Self::fetch_body(id)).await?;

        let not_found = || CatalogError::NotFound {
            provider: CatalogSource::Igdb,
            external_id: external_id.to_string(),
        };

        let record = records.into_iter().next().ok_or_else(not_found)?;
        self.normalize(record, "item fetch")?.ok_or_else(not_found)
    }
}
