// src/ingest/providers/mod.rs
pub mod feed_rss;
pub mod scrape;
pub mod social;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};

use crate::config::{AggregatorConfig, SourceConfig};
use crate::error::FetchError;
use crate::ingest::types::Fetcher;

use self::feed_rss::FeedFetcher;
use self::scrape::ScrapeFetcher;
use self::social::SearchFetcher;

/// Where a fetcher reads its body from. Fixtures keep tests off the network.
pub(crate) enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// Shared outbound client: browser-like UA, locale header, per-request timeout.
pub fn build_http_client(cfg: &AggregatorConfig) -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&cfg.http.accept_language)?,
    );
    let client = reqwest::Client::builder()
        .user_agent(cfg.http.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .build()?;
    Ok(client)
}

pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status: status.as_u16(),
        });
    }
    Ok(resp.text().await?)
}

/// One fetcher per configured source; the variant is picked by the config entry.
pub fn build_fetchers(cfg: &AggregatorConfig, client: &reqwest::Client) -> Vec<Arc<dyn Fetcher>> {
    cfg.sources
        .iter()
        .map(|src| -> Arc<dyn Fetcher> {
            match src {
                SourceConfig::Feed { kind, url } => Arc::new(FeedFetcher::from_url(
                    *kind,
                    url.clone(),
                    cfg.feed_item_cap,
                    client.clone(),
                )),
                SourceConfig::Scrape { kind, url, layout } => Arc::new(ScrapeFetcher::from_url(
                    *kind,
                    url.clone(),
                    layout.clone(),
                    client.clone(),
                )),
                SourceConfig::Search { kind } => {
                    Arc::new(SearchFetcher::new(*kind, cfg.search.clone(), client.clone()))
                }
            }
        })
        .collect()
}
