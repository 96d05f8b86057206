// src/ingest/dates.rs
//! Provider date parsing. Unrecognized input yields `None`, never an error.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::ingest::types::RawDate;

pub fn parse_raw_date(raw: &RawDate) -> Option<DateTime<Utc>> {
    match raw {
        RawDate::Rfc2822(s) => parse_rfc2822(s).or_else(|| parse_rfc3339(s)),
        RawDate::Rfc3339(s) => parse_rfc3339(s),
        RawDate::EpochMillis(ms) => Utc.timestamp_millis_opt(*ms).single(),
        RawDate::Localized { text, format } => parse_localized(text, format),
    }
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    let dt = OffsetDateTime::parse(s.trim(), &Rfc2822).ok()?;
    Utc.timestamp_opt(dt.unix_timestamp(), dt.nanosecond())
        .single()
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Date-only site formats land on midnight UTC.
fn parse_localized(text: &str, format: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(text.trim(), format).ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_pub_date_parses() {
        let dt = parse_raw_date(&RawDate::Rfc2822("Mon, 01 Jul 2024 10:00:00 GMT".into()));
        assert_eq!(dt.map(|d| d.timestamp()), Some(1_719_828_000));
    }

    #[test]
    fn rss_pub_date_with_offset_is_converted_to_utc() {
        let dt = parse_raw_date(&RawDate::Rfc2822("Mon, 01 Jul 2024 12:00:00 +0200".into()));
        assert_eq!(dt.map(|d| d.timestamp()), Some(1_719_828_000));
    }

    #[test]
    fn iso_in_rss_slot_falls_back() {
        let dt = parse_raw_date(&RawDate::Rfc2822("2024-07-01T10:00:00Z".into()));
        assert_eq!(dt.map(|d| d.timestamp()), Some(1_719_828_000));
    }

    #[test]
    fn iso_with_millis_parses() {
        let dt = parse_raw_date(&RawDate::Rfc3339("2024-07-01T10:00:00.000Z".into()));
        assert_eq!(dt.map(|d| d.timestamp()), Some(1_719_828_000));
    }

    #[test]
    fn epoch_millis_parses() {
        let dt = parse_raw_date(&RawDate::EpochMillis(1_719_828_000_000));
        assert_eq!(dt.map(|d| d.timestamp()), Some(1_719_828_000));
    }

    #[test]
    fn localized_formats_parse_to_midnight() {
        let a = parse_raw_date(&RawDate::Localized {
            text: "Jul 1, 2024".into(),
            format: "%b %d, %Y".into(),
        });
        let b = parse_raw_date(&RawDate::Localized {
            text: "01/07/2024".into(),
            format: "%d/%m/%Y".into(),
        });
        assert_eq!(a.map(|d| d.timestamp()), Some(1_719_792_000));
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_raw_date(&RawDate::Rfc2822("yesterday-ish".into())).is_none());
        assert!(parse_raw_date(&RawDate::Rfc3339("".into())).is_none());
        assert!(parse_raw_date(&RawDate::Localized {
            text: "Summer 2024".into(),
            format: "%b %d, %Y".into(),
        })
        .is_none());
    }
}
