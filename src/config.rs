// src/config.rs
//! Aggregator configuration: TOML file (optional) + env overrides + built-in defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::scrape::ScrapeLayout;
use crate::ingest::providers::social::SearchConfig;
use crate::ingest::types::SourceKind;

pub const ENV_CONFIG_PATH: &str = "TRANSFERS_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";

pub const ENV_BEARER_TOKEN: &str = "TWITTER_BEARER_TOKEN";
pub const ENV_REFRESH_INTERVAL: &str = "REFRESH_INTERVAL_SECS";
pub const ENV_FETCH_TIMEOUT: &str = "FETCH_TIMEOUT_SECS";

fn default_refresh_interval_secs() -> u64 {
    15 * 60
}
fn default_fetch_timeout_secs() -> u64 {
    10
}
fn default_feed_item_cap() -> usize {
    20
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .to_string()
}
fn default_accept_language() -> String {
    "en-GB,en;q=0.9".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// One configured source; the variant selects the fetcher implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SourceConfig {
    Feed {
        kind: SourceKind,
        url: String,
    },
    Scrape {
        kind: SourceKind,
        url: String,
        layout: ScrapeLayout,
    },
    Search {
        kind: SourceKind,
    },
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceConfig::Feed { kind, .. }
            | SourceConfig::Scrape { kind, .. }
            | SourceConfig::Search { kind } => *kind,
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::Feed {
            kind: SourceKind::Bbc,
            url: "https://feeds.bbci.co.uk/sport/football/rss.xml".into(),
        },
        SourceConfig::Feed {
            kind: SourceKind::Sky,
            url: "https://www.skysports.com/rss/football".into(),
        },
        SourceConfig::Search {
            kind: SourceKind::Twitter,
        },
        SourceConfig::Scrape {
            kind: SourceKind::Transfermarkt,
            url: "https://www.transfermarkt.com/premier-league/transfers/wettbewerb/GB1".into(),
            layout: ScrapeLayout::transfermarkt(),
        },
        SourceConfig::Scrape {
            kind: SourceKind::Espn,
            url: "https://www.espn.co.uk/football/transfers".into(),
            layout: ScrapeLayout::espn(),
        },
        SourceConfig::Scrape {
            kind: SourceKind::PremierLeague,
            url: "https://www.premierleague.com/transfers".into(),
            layout: ScrapeLayout::premier_league(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Bound on a single source fetch, HTTP included.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_feed_item_cap")]
    pub feed_item_cap: usize,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            feed_item_cap: default_feed_item_cap(),
            http: HttpConfig::default(),
            search: SearchConfig::default(),
            sources: default_sources(),
        }
    }
}

impl AggregatorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AggregatorConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing aggregator config {}", path.display()))
    }

    /// Resolve config:
    /// 1) $TRANSFERS_CONFIG_PATH (must exist)
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    ///
    /// Env overrides are applied on top in every case.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ENV_BEARER_TOKEN) {
            self.search.bearer_token = Some(token);
        }
        if let Some(v) = parse_secs_env(ENV_REFRESH_INTERVAL) {
            self.refresh_interval_secs = v;
        }
        if let Some(v) = parse_secs_env(ENV_FETCH_TIMEOUT) {
            self.fetch_timeout_secs = v;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(anyhow!("refresh_interval_secs must be > 0"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be > 0"));
        }
        let mut seen = std::collections::HashSet::new();
        for s in &self.sources {
            if !seen.insert(s.kind()) {
                return Err(anyhow!("source kind `{}` configured twice", s.kind()));
            }
        }
        Ok(())
    }
}

fn parse_secs_env(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}
