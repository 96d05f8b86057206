// src/ingest/providers/feed_rss.rs
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::providers::{get_text, Mode};
use crate::ingest::types::{FeedEntry, Fetcher, RawDate, RawItem, SourceKind};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 feed source (BBC Sport, Sky Sports).
pub struct FeedFetcher {
    kind: SourceKind,
    item_cap: usize,
    mode: Mode,
}

impl FeedFetcher {
    pub fn from_url(kind: SourceKind, url: impl Into<String>, item_cap: usize, client: reqwest::Client) -> Self {
        Self {
            kind,
            item_cap,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn from_fixture(kind: SourceKind, xml: &str, item_cap: usize) -> Self {
        Self {
            kind,
            item_cap,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Parse a feed body and keep the first `item_cap` entries.
    pub fn parse_items(xml: &str, item_cap: usize) -> Result<Vec<RawItem>, FetchError> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)?;

        let out = rss
            .channel
            .item
            .into_iter()
            .take(item_cap)
            .map(|it| {
                RawItem::Feed(FeedEntry {
                    title: it.title.unwrap_or_default(),
                    link: it.link.unwrap_or_default().trim().to_string(),
                    published: it.pub_date.map(RawDate::Rfc2822),
                    summary: it.description.unwrap_or_default(),
                })
            })
            .collect();
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for FeedFetcher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        let body = match &self.mode {
            Mode::Fixture(s) => return Self::parse_items(s, self.item_cap),
            Mode::Http { url, client } => get_text(client, url).await?,
        };
        Self::parse_items(&body, self.item_cap)
    }
}

/// Feeds embed HTML entities that are not valid XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&pound;", "£")
        .replace("&euro;", "€")
}
