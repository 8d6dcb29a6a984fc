//! CLI command implementations

use anyhow::Context;
use clap::Subcommand;
use mediashelf_catalog::{
    CanonicalItem, CatalogAggregator, DEFAULT_FLATTEN_LIMIT, ItemRequest, SearchRequest,
    SearchScope,
};
use tokio_util::sync::CancellationToken;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search one domain (movie, tv, game, book) or all of them
    Search {
        /// Domain tag or `all`
        scope: String,
        /// Search text
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Maximum number of results to print
        #[arg(short, long, default_value_t = DEFAULT_FLATTEN_LIMIT)]
        limit: usize,
    },
    /// Look up a single item by provider id
    Item {
        /// Domain tag
        domain: String,
        /// Provider tag (tmdb, igdb, openlibrary, google_books)
        source: String,
        /// Provider-native id, optionally percent-encoded
        external_id: String,
        /// Print the item as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the catalog error of the failed lookup, or an output error
pub async fn handle_command(
    command: Commands,
    aggregator: &CatalogAggregator,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            scope,
            query,
            json,
            limit,
        } => search(aggregator, cancel, &scope, &query.join(" "), json, limit).await,
        Commands::Item {
            domain,
            source,
            external_id,
            json,
        } => item(aggregator, cancel, &domain, &source, &external_id, json).await,
    }
}

async fn search(
    aggregator: &CatalogAggregator,
    cancel: &CancellationToken,
    scope: &str,
    query: &str,
    json: bool,
    limit: usize,
) -> anyhow::Result<()> {
    let request = SearchRequest::parse(Some(scope), Some(query))?;

    match request.scope {
        SearchScope::All => {
            let grouped = aggregator
                .search_all_cancellable(&request.query, cancel)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&grouped)?);
            } else {
                print_items(&grouped.flatten(limit));
            }
        }
        SearchScope::Domain(domain) => {
            let mut items = aggregator
                .search_cancellable(domain, &request.query, cancel)
                .await
                .with_context(|| format!("{domain} search failed"))?;
            items.truncate(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                print_items(&items);
            }
        }
    }

    Ok(())
}

async fn item(
    aggregator: &CatalogAggregator,
    cancel: &CancellationToken,
    domain: &str,
    source: &str,
    external_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let request = ItemRequest::parse(Some(domain), Some(source), Some(external_id))?;

    let item = aggregator
        .fetch_by_id_cancellable(request.domain, request.source, &request.external_id, cancel)
        .await
        .with_context(|| format!("lookup of {}:{} failed", request.source, request.external_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{}", format_item(&item));
        if let Some(description) = &item.description {
            println!("\n{description}");
        }
        if let Some(poster) = &item.poster_url {
            println!("\nPoster: {poster}");
        }
    }

    Ok(())
}

fn print_items(items: &[CanonicalItem]) {
    if items.is_empty() {
        println!("No results");
        return;
    }
    for item in items {
        println!("{}", format_item(item));
    }
}

/// One-line summary: `[source:externalId] title (releaseDate)`.
fn format_item(item: &CanonicalItem) -> String {
    let mut line = format!("[{}:{}] {}", item.source, item.external_id, item.title);
    if let Some(date) = &item.release_date {
        line.push_str(&format!(" ({date})"));
    }
    line
}
