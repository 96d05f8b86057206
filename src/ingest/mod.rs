// src/ingest/mod.rs
pub mod dates;
pub mod normalize;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::error::FetchError;
use crate::ingest::normalize::{normalize, relevance_texts};
use crate::ingest::types::{Fetcher, RawItem, SourceKind, TransferRecord};
use crate::relevance::is_relevant;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "transfers_fetch_errors_total",
            "Source fetch failures, labelled by source and error class."
        );
        describe_histogram!("transfers_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_counter!(
            "transfers_kept_total",
            "Records kept after relevance filtering."
        );
        describe_counter!(
            "transfers_filtered_total",
            "Raw items dropped as not transfer-related."
        );
        describe_counter!("transfers_refresh_total", "Completed refresh cycles.");
        describe_gauge!(
            "transfers_last_refresh_ts",
            "Unix ts of the last published snapshot."
        );
    });
}

/// Settled result of one source in a cycle.
#[derive(Debug)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub result: Result<Vec<TransferRecord>, FetchError>,
    pub filtered: usize,
}

impl SourceOutcome {
    /// Failed sources contribute an empty list.
    pub fn into_records(self) -> (SourceKind, Vec<TransferRecord>) {
        (self.kind, self.result.unwrap_or_default())
    }
}

/// Classify then normalize. Pure; no I/O.
pub fn process_items(kind: SourceKind, raw: Vec<RawItem>) -> (Vec<TransferRecord>, usize) {
    let mut filtered = 0usize;
    let mut kept = Vec::with_capacity(raw.len());
    for item in raw {
        if !relevance_texts(&item).iter().any(|t| is_relevant(t)) {
            filtered += 1;
            continue;
        }
        kept.push(normalize(item, kind));
    }
    (kept, filtered)
}

/// Fetch one source under `timeout`, then classify and normalize.
pub async fn collect_source(fetcher: &dyn Fetcher, timeout: Duration) -> SourceOutcome {
    let kind = fetcher.kind();
    let t0 = Instant::now();
    let fetched = match tokio::time::timeout(timeout, fetcher.fetch()).await {
        Ok(r) => r,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };
    histogram!("transfers_fetch_ms", "source" => kind.as_str())
        .record(t0.elapsed().as_secs_f64() * 1_000.0);

    match fetched {
        Ok(raw) => {
            let fetched_n = raw.len();
            let (records, filtered) = process_items(kind, raw);
            counter!("transfers_kept_total").increment(records.len() as u64);
            counter!("transfers_filtered_total").increment(filtered as u64);
            tracing::info!(
                target: "ingest",
                source = %kind,
                fetched = fetched_n,
                kept = records.len(),
                filtered,
                "source settled"
            );
            SourceOutcome {
                kind,
                result: Ok(records),
                filtered,
            }
        }
        Err(e) => failed(kind, e),
    }
}

fn failed(kind: SourceKind, e: FetchError) -> SourceOutcome {
    tracing::warn!(target: "ingest", source = %kind, class = e.class(), error = %e, "source failed");
    counter!("transfers_fetch_errors_total", "source" => kind.as_str(), "class" => e.class())
        .increment(1);
    SourceOutcome {
        kind,
        result: Err(e),
        filtered: 0,
    }
}

/// Fan out one task per fetcher; returns once all have settled, in fetcher order.
/// A task that panics settles as a failed source.
pub async fn run_once(fetchers: &[Arc<dyn Fetcher>], timeout: Duration) -> Vec<SourceOutcome> {
    ensure_metrics_described();
    let tasks: Vec<(SourceKind, JoinHandle<SourceOutcome>)> = fetchers
        .iter()
        .map(|f| {
            let kind = f.kind();
            let f = Arc::clone(f);
            let handle = tokio::spawn(async move { collect_source(f.as_ref(), timeout).await });
            (kind, handle)
        })
        .collect();
    let (kinds, handles): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();

    join_all(handles)
        .await
        .into_iter()
        .zip(kinds)
        .map(|(joined, kind)| joined.unwrap_or_else(|e| failed(kind, e.into())))
        .collect()
}
