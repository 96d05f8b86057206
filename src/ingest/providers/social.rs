// src/ingest/providers/social.rs
//! Social-post search source (Twitter API v2 recent search).
//! Without a bearer token it serves a fixed sample set instead of failing.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::ingest::types::{EngagementMetrics, Fetcher, RawDate, RawItem, SocialPost, SourceKind};

pub const DEFAULT_SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}
fn default_keywords() -> Vec<String> {
    [
        "premier league transfer",
        "premier league signing",
        "transfer confirmed",
        "joins premier league",
        "signs for",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_max_queries() -> usize {
    2
}
fn default_max_results() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Only the first N keywords are queried per cycle.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Usually injected from `TWITTER_BEARER_TOKEN`.
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            keywords: default_keywords(),
            max_queries: default_max_queries(),
            max_results: default_max_results(),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
    public_metrics: Option<EngagementMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Map one search response to posts, resolving authors through `includes.users`.
pub fn parse_search_response(body: &str) -> Result<Vec<RawItem>, FetchError> {
    let resp: SearchResponse = serde_json::from_str(body)?;
    let users = resp.includes.users;
    Ok(resp
        .data
        .into_iter()
        .map(|t| {
            let author_handle = t
                .author_id
                .as_deref()
                .and_then(|aid| users.iter().find(|u| u.id == aid))
                .map(|u| u.username.clone());
            RawItem::Post(SocialPost {
                id: t.id,
                text: t.text,
                author_handle,
                created_at: t.created_at.map(RawDate::Rfc3339),
                metrics: t.public_metrics,
            })
        })
        .collect())
}

/// Built-in posts served when no credential is configured. Deterministic for a given `now`.
pub fn sample_posts(now: DateTime<Utc>) -> Vec<RawItem> {
    let at = |hours: i64| {
        Some(RawDate::Rfc3339(
            (now - ChronoDuration::hours(hours)).to_rfc3339_opts(SecondsFormat::Millis, true),
        ))
    };
    vec![
        RawItem::Post(SocialPost {
            id: "123".into(),
            text: "Manchester United completes signing of new midfielder\n\
                   BREAKING: Manchester United have confirmed the signing of a new midfielder for £50m. \
                   The player will join on a 4-year deal. #MUFC #Transfer"
                .into(),
            author_handle: Some("SkySportsNews".into()),
            created_at: at(2),
            metrics: Some(EngagementMetrics {
                retweet_count: 150,
                like_count: 300,
                ..Default::default()
            }),
        }),
        RawItem::Post(SocialPost {
            id: "124".into(),
            text: "Arsenal close to completing striker deal\n\
                   Arsenal are reportedly close to completing a deal for a new striker. \
                   Medical scheduled for tomorrow. #AFC #Transfers"
                .into(),
            author_handle: Some("FabrizioRomano".into()),
            created_at: at(4),
            metrics: Some(EngagementMetrics {
                retweet_count: 200,
                like_count: 500,
                ..Default::default()
            }),
        }),
    ]
}

pub struct SearchFetcher {
    kind: SourceKind,
    cfg: SearchConfig,
    client: reqwest::Client,
}

impl SearchFetcher {
    pub fn new(kind: SourceKind, cfg: SearchConfig, client: reqwest::Client) -> Self {
        Self { kind, cfg, client }
    }

    fn token(&self) -> Option<&str> {
        self.cfg
            .bearer_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    async fn search(&self, token: &str, keyword: &str) -> Result<Vec<RawItem>, FetchError> {
        let max_results = self.cfg.max_results.clamp(10, 100).to_string();
        let resp = self
            .client
            .get(&self.cfg.search_url)
            .bearer_auth(token)
            .query(&[
                ("query", keyword),
                ("tweet.fields", "created_at,public_metrics,author_id"),
                ("user.fields", "name,username,verified"),
                ("expansions", "author_id"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }
        parse_search_response(&resp.text().await?)
    }
}

#[async_trait]
impl Fetcher for SearchFetcher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        let Some(token) = self.token() else {
            let missing = FetchError::ConfigurationMissing("TWITTER_BEARER_TOKEN");
            tracing::info!(target: "ingest", source = %self.kind, reason = %missing, "serving sample posts");
            return Ok(sample_posts(Utc::now()));
        };

        let mut out = Vec::new();
        let mut last_err = None;
        let mut ok_queries = 0usize;
        for keyword in self.cfg.keywords.iter().take(self.cfg.max_queries) {
            match self.search(token, keyword).await {
                Ok(mut items) => {
                    ok_queries += 1;
                    out.append(&mut items);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = %e, keyword = %keyword, "search query failed");
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if ok_queries == 0 => Err(e),
            _ => Ok(out),
        }
    }
}
