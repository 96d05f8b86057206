// src/store.rs
//! Published snapshot + its single-writer / many-reader holder.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::ingest::types::{SourceKind, TransferRecord};
use crate::merge::sort_newest_first;

/// Immutable once built; replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSnapshot {
    by_source_kind: BTreeMap<SourceKind, Vec<TransferRecord>>,
    last_updated: Option<DateTime<Utc>>,
}

impl AggregationSnapshot {
    /// Every kind present and empty, `last_updated` unset.
    pub fn empty() -> Self {
        Self {
            by_source_kind: SourceKind::ALL.into_iter().map(|k| (k, Vec::new())).collect(),
            last_updated: None,
        }
    }

    /// Kinds missing from `by_source_kind` are filled in empty.
    pub(crate) fn new(
        mut by_source_kind: BTreeMap<SourceKind, Vec<TransferRecord>>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        for k in SourceKind::ALL {
            by_source_kind.entry(k).or_default();
        }
        Self {
            by_source_kind,
            last_updated,
        }
    }

    pub fn records(&self, kind: SourceKind) -> &[TransferRecord] {
        self.by_source_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn by_source_kind(&self) -> &BTreeMap<SourceKind, Vec<TransferRecord>> {
        &self.by_source_kind
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn total(&self) -> usize {
        self.by_source_kind.values().map(Vec::len).sum()
    }

    /// Combined view across kinds, derived on demand with the same ordering rule.
    pub fn all_sources(&self) -> Vec<TransferRecord> {
        let mut all: Vec<TransferRecord> = SourceKind::ALL
            .into_iter()
            .flat_map(|k| self.records(k).iter().cloned())
            .collect();
        sort_newest_first(&mut all);
        all
    }
}

impl Default for AggregationSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// `{ "bbc": [...], ..., "lastUpdated": ... }`
impl Serialize for AggregationSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.by_source_kind.len() + 1))?;
        for (kind, records) in &self.by_source_kind {
            map.serialize_entry(kind.as_str(), records)?;
        }
        map.serialize_entry("lastUpdated", &self.last_updated)?;
        map.end()
    }
}

/// Holds the current snapshot behind an `Arc`. The lock only guards the pointer,
/// so readers never wait on fetch or merge work. A reader can briefly contend
/// with `publish` for the pointer swap itself.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Arc<AggregationSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: AggregationSnapshot) -> Arc<AggregationSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = next.clone();
        next
    }

    pub fn current(&self) -> Arc<AggregationSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, kind: SourceKind, ts: Option<i64>) -> TransferRecord {
        TransferRecord {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            url: String::new(),
            source: kind.label().into(),
            source_kind: kind,
            published_at: None,
            timestamp: ts,
            metrics: None,
        }
    }

    #[test]
    fn empty_store_has_all_kinds_and_no_timestamp() {
        let store = SnapshotStore::new();
        let snap = store.current();
        assert!(snap.last_updated().is_none());
        assert_eq!(snap.by_source_kind().len(), SourceKind::ALL.len());
        assert_eq!(snap.total(), 0);
    }

    #[test]
    fn publish_swaps_and_old_reference_stays_valid() {
        let store = SnapshotStore::new();
        let before = store.current();

        let mut m = BTreeMap::new();
        m.insert(SourceKind::Bbc, vec![rec("a", SourceKind::Bbc, Some(1))]);
        store.publish(AggregationSnapshot::new(m, Some(Utc::now())));

        assert_eq!(before.total(), 0);
        assert_eq!(store.current().records(SourceKind::Bbc).len(), 1);
        assert!(store.current().last_updated().is_some());
    }

    #[test]
    fn serializes_flat_with_last_updated() {
        let v = serde_json::to_value(AggregationSnapshot::empty()).unwrap();
        for k in SourceKind::ALL {
            assert!(v[k.as_str()].is_array(), "missing {k}");
        }
        assert!(v["lastUpdated"].is_null());
    }

    #[test]
    fn all_sources_interleaves_by_timestamp() {
        let mut m = BTreeMap::new();
        m.insert(
            SourceKind::Bbc,
            vec![rec("b1", SourceKind::Bbc, Some(30)), rec("b2", SourceKind::Bbc, None)],
        );
        m.insert(SourceKind::Sky, vec![rec("s1", SourceKind::Sky, Some(40))]);
        let snap = AggregationSnapshot::new(m, None);
        let ids: Vec<String> = snap.all_sources().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["s1", "b1", "b2"]);
    }
}
