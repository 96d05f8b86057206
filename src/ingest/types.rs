// src/ingest/types.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Closed set of upstream providers. Wire names are the lower-case serde names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bbc,
    Sky,
    Twitter,
    Transfermarkt,
    Espn,
    PremierLeague,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Bbc,
        SourceKind::Sky,
        SourceKind::Twitter,
        SourceKind::Transfermarkt,
        SourceKind::Espn,
        SourceKind::PremierLeague,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Bbc => "bbc",
            SourceKind::Sky => "sky",
            SourceKind::Twitter => "twitter",
            SourceKind::Transfermarkt => "transfermarkt",
            SourceKind::Espn => "espn",
            SourceKind::PremierLeague => "premierleague",
        }
    }

    /// Display label used as `source` for every kind except social posts,
    /// which carry the author handle instead.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Bbc => "BBC Sport",
            SourceKind::Sky => "Sky Sports",
            SourceKind::Twitter => "Twitter",
            SourceKind::Transfermarkt => "Transfermarkt",
            SourceKind::Espn => "ESPN",
            SourceKind::PremierLeague => "Premier League",
        }
    }

    /// Upper bound on records kept per cycle after sorting.
    pub fn record_cap(self) -> Option<usize> {
        match self {
            SourceKind::Twitter => Some(10),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSourceKind(pub String);

impl fmt::Display for UnknownSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source kind `{}`", self.0)
    }
}

impl std::error::Error for UnknownSourceKind {}

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSourceKind(s.to_string()))
    }
}

/// Engagement counters reported by the social search API (`public_metrics`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

/// The shared output unit published in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub source_kind: SourceKind,
    pub published_at: Option<DateTime<Utc>>,
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EngagementMetrics>,
}

/// Provider-native date representation, parsed by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDate {
    /// RSS `pubDate`, e.g. `Mon, 01 Jul 2024 10:00:00 GMT`.
    Rfc2822(String),
    /// ISO-8601 / RFC 3339, e.g. `2024-07-01T10:00:00.000Z`.
    Rfc3339(String),
    EpochMillis(i64),
    /// Site-local text with a known `chrono` format, e.g. `Jul 1, 2024` / `%b %d, %Y`.
    Localized { text: String, format: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<RawDate>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialPost {
    pub id: String,
    pub text: String,
    pub author_handle: Option<String>,
    pub created_at: Option<RawDate>,
    pub metrics: Option<EngagementMetrics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRow {
    pub player: String,
    pub from_club: String,
    pub to_club: String,
    pub fee: Option<String>,
    pub date: Option<RawDate>,
    pub url: String,
}

/// What a fetcher yields before classification and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawItem {
    Feed(FeedEntry),
    Post(SocialPost),
    Row(TransferRow),
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn fetch(&self) -> Result<Vec<RawItem>, FetchError>;
}
