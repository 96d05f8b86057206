// src/ingest/providers/scrape.rs
//! Markup-scraped transfer tables. Each site is one `ScrapeLayout`; the fetch,
//! roster filter and link resolution are shared.

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::ingest::providers::{get_text, Mode};
use crate::ingest::types::{Fetcher, RawDate, RawItem, SourceKind, TransferRow};
use crate::relevance::is_recognized_club;

/// CSS selectors for an HTML transfer table. Cell selectors are relative to the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSelectors {
    pub row: String,
    pub player: String,
    pub from_club: String,
    pub to_club: String,
    pub date: String,
    pub fee: String,
    pub link: String,
    /// `chrono` format of the date cell.
    pub date_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScrapeLayout {
    Table(TableSelectors),
    /// JSON state embedded in a `<script>` tag; `pointer` addresses the transfer array.
    JsonState {
        script_selector: String,
        pointer: String,
    },
}

impl ScrapeLayout {
    pub fn transfermarkt() -> Self {
        ScrapeLayout::Table(TableSelectors {
            row: "table.items > tbody > tr".into(),
            player: "td.player a".into(),
            from_club: "td.from-club".into(),
            to_club: "td.to-club".into(),
            date: "td.date".into(),
            fee: "td.fee".into(),
            link: "td.player a".into(),
            date_format: "%b %d, %Y".into(),
        })
    }

    pub fn espn() -> Self {
        ScrapeLayout::Table(TableSelectors {
            row: "tbody.Table__TBODY > tr.Table__TR".into(),
            player: "td:nth-child(2) a".into(),
            from_club: "td:nth-child(3)".into(),
            to_club: "td:nth-child(4)".into(),
            date: "td:nth-child(1)".into(),
            fee: "td:nth-child(5)".into(),
            link: "td:nth-child(2) a".into(),
            date_format: "%d/%m/%Y".into(),
        })
    }

    pub fn premier_league() -> Self {
        ScrapeLayout::JsonState {
            script_selector: "script#__NEXT_DATA__".into(),
            pointer: "/props/pageProps/transfers".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateTransfer {
    #[serde(default)]
    player_name: String,
    #[serde(default)]
    from_club: String,
    #[serde(default)]
    to_club: String,
    fee: Option<String>,
    /// Epoch milliseconds.
    transfer_date: Option<i64>,
    url: Option<String>,
}

pub struct ScrapeFetcher {
    kind: SourceKind,
    base_url: String,
    layout: ScrapeLayout,
    mode: Mode,
}

impl ScrapeFetcher {
    pub fn from_url(
        kind: SourceKind,
        url: impl Into<String>,
        layout: ScrapeLayout,
        client: reqwest::Client,
    ) -> Self {
        let url = url.into();
        Self {
            kind,
            base_url: url.clone(),
            layout,
            mode: Mode::Http { url, client },
        }
    }

    pub fn from_fixture(
        kind: SourceKind,
        base_url: impl Into<String>,
        html: &str,
        layout: ScrapeLayout,
    ) -> Self {
        Self {
            kind,
            base_url: base_url.into(),
            layout,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    /// Extract rows from a page, keeping only moves into a recognized club.
    pub fn parse_page(
        html: &str,
        base_url: &str,
        layout: &ScrapeLayout,
    ) -> Result<Vec<RawItem>, FetchError> {
        let doc = Html::parse_document(html);
        let rows = match layout {
            ScrapeLayout::Table(sel) => parse_table(&doc, base_url, sel)?,
            ScrapeLayout::JsonState {
                script_selector,
                pointer,
            } => parse_json_state(&doc, base_url, script_selector, pointer)?,
        };

        let total = rows.len();
        let kept: Vec<RawItem> = rows
            .into_iter()
            .filter(|r| !r.player.is_empty() && is_recognized_club(&r.to_club))
            .map(RawItem::Row)
            .collect();
        tracing::debug!(target: "ingest", total, kept = kept.len(), "scraped rows");
        Ok(kept)
    }
}

#[async_trait]
impl Fetcher for ScrapeFetcher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, FetchError> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { url, client } => get_text(client, url).await?,
        };
        Self::parse_page(&body, &self.base_url, &self.layout)
    }
}

fn selector(s: &str) -> Result<Selector, FetchError> {
    Selector::parse(s).map_err(|e| FetchError::parse(format!("invalid selector '{s}': {e:?}")))
}

fn cell_text(row: &ElementRef<'_>, sel: &Selector) -> String {
    row.select(sel)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

fn resolve_link(base_url: &str, href: &str) -> String {
    Url::parse(base_url)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

fn parse_table(
    doc: &Html,
    base_url: &str,
    sel: &TableSelectors,
) -> Result<Vec<TransferRow>, FetchError> {
    let row_sel = selector(&sel.row)?;
    let player_sel = selector(&sel.player)?;
    let from_sel = selector(&sel.from_club)?;
    let to_sel = selector(&sel.to_club)?;
    let date_sel = selector(&sel.date)?;
    let fee_sel = selector(&sel.fee)?;
    let link_sel = selector(&sel.link)?;

    let mut out = Vec::new();
    for row in doc.select(&row_sel) {
        let date = cell_text(&row, &date_sel);
        let fee = cell_text(&row, &fee_sel);
        let url = row
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| resolve_link(base_url, href))
            .unwrap_or_else(|| base_url.to_string());

        out.push(TransferRow {
            player: cell_text(&row, &player_sel),
            from_club: cell_text(&row, &from_sel),
            to_club: cell_text(&row, &to_sel),
            fee: (!fee.is_empty()).then_some(fee),
            date: (!date.is_empty()).then(|| RawDate::Localized {
                text: date,
                format: sel.date_format.clone(),
            }),
            url,
        });
    }
    Ok(out)
}

fn parse_json_state(
    doc: &Html,
    base_url: &str,
    script_selector: &str,
    pointer: &str,
) -> Result<Vec<TransferRow>, FetchError> {
    let script_sel = selector(script_selector)?;
    let script = doc
        .select(&script_sel)
        .next()
        .ok_or_else(|| FetchError::parse(format!("state script '{script_selector}' not found")))?;
    let raw: String = script.text().collect();
    let state: serde_json::Value = serde_json::from_str(raw.trim())?;
    let list = state
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| FetchError::parse(format!("state pointer '{pointer}' missing")))?;
    let transfers: Vec<StateTransfer> = serde_json::from_value(list)?;

    Ok(transfers
        .into_iter()
        .map(|t| TransferRow {
            player: t.player_name.trim().to_string(),
            from_club: t.from_club.trim().to_string(),
            to_club: t.to_club.trim().to_string(),
            fee: t.fee.filter(|f| !f.trim().is_empty()),
            date: t.transfer_date.map(RawDate::EpochMillis),
            url: t
                .url
                .as_deref()
                .map(|u| resolve_link(base_url, u))
                .unwrap_or_else(|| base_url.to_string()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(items: Vec<RawItem>) -> Vec<TransferRow> {
        items
            .into_iter()
            .map(|i| match i {
                RawItem::Row(r) => r,
                other => panic!("unexpected item {other:?}"),
            })
            .collect()
    }

    #[test]
    fn table_rows_are_filtered_by_destination_roster() {
        let html = r#"<html><body><table class="items"><tbody>
            <tr><td class="player"><a href="/a/profil/1">Player A</a></td><td class="from-club">Ajax</td>
                <td class="to-club">Brighton &amp; Hove Albion</td><td class="date">Jul 5, 2024</td><td class="fee">€10.00m</td></tr>
            <tr><td class="player"><a href="/b/profil/2">Player B</a></td><td class="from-club">Chelsea</td>
                <td class="to-club">Juventus</td><td class="date">Jul 6, 2024</td><td class="fee">free transfer</td></tr>
        </tbody></table></body></html>"#;
        let got = rows(
            ScrapeFetcher::parse_page(html, "https://tm.example/transfers", &ScrapeLayout::transfermarkt())
                .unwrap(),
        );
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].player, "Player A");
        assert_eq!(got[0].to_club, "Brighton & Hove Albion");
        assert_eq!(got[0].url, "https://tm.example/a/profil/1");
        assert_eq!(got[0].fee.as_deref(), Some("€10.00m"));
    }

    #[test]
    fn json_state_missing_script_is_parse_error() {
        let err = ScrapeFetcher::parse_page(
            "<html><body></body></html>",
            "https://pl.example/transfers",
            &ScrapeLayout::premier_league(),
        )
        .unwrap_err();
        assert_eq!(err.class(), "parse");
    }

    #[test]
    fn bad_selector_is_parse_error() {
        let layout = ScrapeLayout::JsonState {
            script_selector: "script[[".into(),
            pointer: "/x".into(),
        };
        let err = ScrapeFetcher::parse_page("<html></html>", "https://x.example", &layout).unwrap_err();
        assert_eq!(err.class(), "parse");
    }
}
