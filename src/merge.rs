// src/merge.rs
//! Per-source dedup + ordering into an `AggregationSnapshot`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::ingest::types::{SourceKind, TransferRecord};
use crate::store::AggregationSnapshot;

/// Newest first; undated last. Ties keep arrival order.
fn newest_first(a: &TransferRecord, b: &TransferRecord) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by `timestamp` descending with undated records after dated ones.
pub fn sort_newest_first(records: &mut [TransferRecord]) {
    records.sort_by(newest_first);
}

/// Collapse repeated ids; first occurrence wins. Returns the number dropped.
pub fn dedup_by_id(records: &mut Vec<TransferRecord>) -> usize {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let before = records.len();
    records.retain(|r| seen.insert(r.id.clone()));
    before - records.len()
}

/// Build a snapshot from per-source results. Sources are never merged with each other.
pub fn merge<I>(results: I, now: DateTime<Utc>) -> AggregationSnapshot
where
    I: IntoIterator<Item = (SourceKind, Vec<TransferRecord>)>,
{
    let mut grouped: BTreeMap<SourceKind, Vec<TransferRecord>> = BTreeMap::new();
    for (kind, mut records) in results {
        grouped.entry(kind).or_default().append(&mut records);
    }

    for (kind, records) in grouped.iter_mut() {
        let dropped = dedup_by_id(records);
        if dropped > 0 {
            tracing::debug!(target: "ingest", source = %kind, dropped, "duplicate ids collapsed");
        }
        sort_newest_first(records);
        if let Some(cap) = kind.record_cap() {
            records.truncate(cap);
        }
    }

    AggregationSnapshot::new(grouped, Some(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, ts: Option<i64>) -> TransferRecord {
        TransferRecord {
            id: id.into(),
            title: format!("title {id}"),
            description: String::new(),
            url: String::new(),
            source: "BBC Sport".into(),
            source_kind: SourceKind::Bbc,
            published_at: None,
            timestamp: ts,
            metrics: None,
        }
    }

    fn ids(records: &[TransferRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn sort_is_stable_and_undated_go_last() {
        let mut v = vec![
            rec("u1", None),
            rec("a", Some(10)),
            rec("b", Some(20)),
            rec("c", Some(10)),
            rec("u2", None),
        ];
        sort_newest_first(&mut v);
        assert_eq!(ids(&v), vec!["b", "a", "c", "u1", "u2"]);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut first = rec("x", Some(1));
        first.title = "first".into();
        let mut second = rec("x", Some(99));
        second.title = "second".into();

        let snap = merge(vec![(SourceKind::Bbc, vec![first, second])], Utc::now());
        let bbc = snap.records(SourceKind::Bbc);
        assert_eq!(bbc.len(), 1);
        assert_eq!(bbc[0].title, "first");
    }

    #[test]
    fn cross_source_duplicates_are_preserved() {
        let mut sky = rec("same", Some(5));
        sky.source_kind = SourceKind::Sky;
        let snap = merge(
            vec![
                (SourceKind::Bbc, vec![rec("same", Some(5))]),
                (SourceKind::Sky, vec![sky]),
            ],
            Utc::now(),
        );
        assert_eq!(snap.records(SourceKind::Bbc).len(), 1);
        assert_eq!(snap.records(SourceKind::Sky).len(), 1);
        assert_eq!(snap.all_sources().len(), 2);
    }

    #[test]
    fn social_kind_is_capped() {
        let posts: Vec<TransferRecord> = (0..15)
            .map(|i| {
                let mut r = rec(&format!("t{i}"), Some(i));
                r.source_kind = SourceKind::Twitter;
                r
            })
            .collect();
        let snap = merge(vec![(SourceKind::Twitter, posts)], Utc::now());
        let tw = snap.records(SourceKind::Twitter);
        assert_eq!(tw.len(), 10);
        assert_eq!(tw[0].id, "t14");
    }

    #[test]
    fn merge_is_idempotent_on_id_sets() {
        let input = || {
            vec![
                (SourceKind::Bbc, vec![rec("a", Some(1)), rec("b", None), rec("a", Some(2))]),
                (SourceKind::Espn, vec![rec("e", Some(3))]),
            ]
        };
        let now = Utc::now();
        let s1 = merge(input(), now);
        let s2 = merge(input(), now);
        for k in SourceKind::ALL {
            let a: HashSet<&str> = s1.records(k).iter().map(|r| r.id.as_str()).collect();
            let b: HashSet<&str> = s2.records(k).iter().map(|r| r.id.as_str()).collect();
            assert_eq!(a, b, "{k}");
        }
        assert_eq!(s1, s2);
    }

    #[test]
    fn missing_kinds_are_present_and_empty() {
        let snap = merge(Vec::new(), Utc::now());
        for k in SourceKind::ALL {
            assert!(snap.records(k).is_empty());
        }
        assert!(snap.last_updated().is_some());
    }
}
