// src/ingest/normalize.rs
//! RawItem -> TransferRecord: text cleanup, title synthesis, dates, id fingerprint.

use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::ingest::dates::parse_raw_date;
use crate::ingest::types::{RawItem, SourceKind, TransferRecord};

pub const DESCRIPTION_MAX_CHARS: usize = 300;
pub const TITLE_MAX_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

/// Decode entities, strip tags, normalize curly quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Cut to `max` chars and mark the cut; text at or under the bound is untouched.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str(ELLIPSIS);
    out
}

pub fn clean_description(s: &str) -> String {
    truncate_with_ellipsis(&normalize_text(s), DESCRIPTION_MAX_CHARS)
}

/// First line of a post, capped at 100 chars (97 + "...").
pub fn extract_title(text: &str) -> String {
    let first = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if first.chars().count() > TITLE_MAX_CHARS {
        let mut out: String = first.chars().take(TITLE_MAX_CHARS - ELLIPSIS.len()).collect();
        out.push_str(ELLIPSIS);
        out
    } else {
        first.to_string()
    }
}

/// `<kind>_<12 hex>` over the lower-cased alphanumeric content. Stable across cycles.
pub fn fingerprint_id(text: &str, kind: SourceKind) -> String {
    let canon: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    let digest = Sha256::digest(canon.as_bytes());
    let mut out = String::with_capacity(kind.as_str().len() + 13);
    out.push_str(kind.as_str());
    out.push('_');
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn row_title(player: &str, to_club: &str) -> String {
    format!("{} to {}", player.trim(), to_club.trim())
}

fn row_description(from_club: &str, fee: Option<&str>) -> String {
    let mut out = format!("Completes move from {}.", from_club.trim());
    if let Some(fee) = fee.map(str::trim).filter(|f| !f.is_empty()) {
        out.push_str(" Fee: ");
        out.push_str(fee);
    }
    out
}

/// Texts the relevance gate sees for an item; the item is kept if any one passes.
/// Feed titles and summaries are judged separately.
///
/// Rows always read as a completed move, so in practice they are gated by the
/// destination-roster check in the scrape provider.
pub fn relevance_texts(raw: &RawItem) -> Vec<String> {
    match raw {
        RawItem::Feed(e) => vec![e.title.clone(), e.summary.clone()],
        RawItem::Post(p) => vec![p.text.clone()],
        RawItem::Row(r) => vec![format!(
            "{}\n{}",
            row_title(&r.player, &r.to_club),
            row_description(&r.from_club, r.fee.as_deref())
        )],
    }
}

pub fn normalize(raw: RawItem, kind: SourceKind) -> TransferRecord {
    let (title, description, url, source, date, metrics) = match raw {
        RawItem::Feed(e) => {
            let description = clean_description(&e.summary);
            let mut title = normalize_text(&e.title);
            if title.is_empty() {
                title = extract_title(&description);
            }
            (title, description, e.link, kind.label().to_string(), e.published, None)
        }
        RawItem::Post(p) => {
            let (url, source) = match p.author_handle.as_deref().filter(|h| !h.is_empty()) {
                Some(h) => (
                    format!("https://twitter.com/{}/status/{}", h, p.id),
                    format!("@{h}"),
                ),
                None => (
                    format!("https://twitter.com/i/web/status/{}", p.id),
                    format!("@{}", kind.label()),
                ),
            };
            (
                extract_title(&p.text),
                clean_description(&p.text),
                url,
                source,
                p.created_at,
                p.metrics,
            )
        }
        RawItem::Row(r) => (
            row_title(&r.player, &r.to_club),
            clean_description(&row_description(&r.from_club, r.fee.as_deref())),
            r.url,
            kind.label().to_string(),
            r.date,
            None,
        ),
    };

    let published_at = date.as_ref().and_then(parse_raw_date);
    let id = match kind {
        SourceKind::Twitter => fingerprint_id(&description, kind),
        _ => fingerprint_id(&title, kind),
    };

    TransferRecord {
        id,
        title,
        description,
        url,
        source,
        source_kind: kind,
        timestamp: published_at.map(|d| d.timestamp()),
        published_at,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{EngagementMetrics, FeedEntry, RawDate, SocialPost, TransferRow};

    #[test]
    fn normalize_text_strips_tags_and_collapses_ws() {
        let s = "  <p>Arsenal&nbsp;&nbsp;sign <b>winger</b></p>\n\n &ldquo;done&rdquo; ";
        assert_eq!(normalize_text(s), "Arsenal sign winger \"done\"");
    }

    #[test]
    fn description_boundary_300_is_untouched() {
        let s = "a".repeat(300);
        assert_eq!(clean_description(&s), s);
    }

    #[test]
    fn description_boundary_301_is_truncated_with_marker() {
        let s = "a".repeat(301);
        let out = clean_description(&s);
        assert_eq!(out, format!("{}...", "a".repeat(300)));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let s = "é".repeat(300);
        assert_eq!(truncate_with_ellipsis(&s, 300), s);
    }

    #[test]
    fn long_first_line_title_is_capped() {
        let line = "x".repeat(150);
        let t = extract_title(&format!("{line}\nsecond"));
        assert_eq!(t.chars().count(), 100);
        assert!(t.ends_with("..."));
        assert_eq!(extract_title("Short\nrest"), "Short");
    }

    #[test]
    fn fingerprint_is_content_based() {
        let a = fingerprint_id("Chelsea sign striker!", SourceKind::Bbc);
        let b = fingerprint_id("chelsea  SIGN striker", SourceKind::Bbc);
        let c = fingerprint_id("chelsea sign striker", SourceKind::Sky);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("bbc_"));
        assert_eq!(a.len(), "bbc_".len() + 12);
    }

    #[test]
    fn iso_round_trip_matches_direct_parse() {
        let iso = "2024-08-30T17:45:00Z";
        let rec = normalize(
            RawItem::Post(SocialPost {
                id: "1".into(),
                text: "Arsenal confirm loan deal".into(),
                author_handle: Some("Arsenal".into()),
                created_at: Some(RawDate::Rfc3339(iso.into())),
                metrics: None,
            }),
            SourceKind::Twitter,
        );
        let direct = chrono::DateTime::parse_from_rfc3339(iso).unwrap().timestamp();
        assert_eq!(rec.timestamp, Some(direct));
        assert_eq!(rec.published_at.map(|d| d.timestamp()), Some(direct));
    }

    #[test]
    fn unparseable_date_keeps_record_undated() {
        let rec = normalize(
            RawItem::Feed(FeedEntry {
                title: "Everton agree fee".into(),
                link: "https://example.test/a".into(),
                published: Some(RawDate::Rfc2822("not a date".into())),
                summary: "<p>Body</p>".into(),
            }),
            SourceKind::Bbc,
        );
        assert!(rec.published_at.is_none());
        assert!(rec.timestamp.is_none());
        assert_eq!(rec.description, "Body");
        assert_eq!(rec.source, "BBC Sport");
    }

    #[test]
    fn empty_feed_title_falls_back_to_description() {
        let rec = normalize(
            RawItem::Feed(FeedEntry {
                title: "  ".into(),
                link: "https://example.test/a".into(),
                published: None,
                summary: "Fulham complete signing of defender".into(),
            }),
            SourceKind::Sky,
        );
        assert_eq!(rec.title, "Fulham complete signing of defender");
    }

    #[test]
    fn row_is_synthesized_from_fields() {
        let rec = normalize(
            RawItem::Row(TransferRow {
                player: "Joao Palhinha".into(),
                from_club: "Fulham".into(),
                to_club: "Bayern Munich".into(),
                fee: Some("€51.00m".into()),
                date: None,
                url: "https://example.test/p".into(),
            }),
            SourceKind::Transfermarkt,
        );
        assert_eq!(rec.title, "Joao Palhinha to Bayern Munich");
        assert_eq!(rec.description, "Completes move from Fulham. Fee: €51.00m");
    }

    #[test]
    fn feed_candidates_are_title_and_summary() {
        let raw = RawItem::Feed(FeedEntry {
            title: "Transfer window: live updates".into(),
            link: String::new(),
            published: None,
            summary: "Arsenal beat Chelsea".into(),
        });
        let texts = relevance_texts(&raw);
        assert_eq!(texts, vec!["Transfer window: live updates", "Arsenal beat Chelsea"]);
        assert!(!texts.iter().any(|t| crate::relevance::is_relevant(t)));
    }

    #[test]
    fn row_text_always_reads_as_a_move() {
        // Destination is off-roster but the source club is on it, so the text
        // gate passes; the scrape provider's roster check is what drops it.
        let raw = RawItem::Row(TransferRow {
            player: "Joao Palhinha".into(),
            from_club: "Fulham".into(),
            to_club: "Bayern Munich".into(),
            fee: None,
            date: None,
            url: String::new(),
        });
        assert!(relevance_texts(&raw).iter().any(|t| crate::relevance::is_relevant(t)));
    }

    #[test]
    fn post_uses_handle_and_keeps_metrics() {
        let m = EngagementMetrics {
            retweet_count: 3,
            like_count: 9,
            ..Default::default()
        };
        let rec = normalize(
            RawItem::Post(SocialPost {
                id: "42".into(),
                text: "Here we go! Chelsea deal done\nmore soon".into(),
                author_handle: Some("FabrizioRomano".into()),
                created_at: None,
                metrics: Some(m),
            }),
            SourceKind::Twitter,
        );
        assert_eq!(rec.source, "@FabrizioRomano");
        assert_eq!(rec.url, "https://twitter.com/FabrizioRomano/status/42");
        assert_eq!(rec.title, "Here we go! Chelsea deal done");
        assert_eq!(rec.metrics, Some(m));
    }
}
