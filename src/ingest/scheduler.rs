// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::types::Fetcher;
use crate::ingest::{run_once, SourceOutcome};
use crate::merge::merge;
use crate::store::{AggregationSnapshot, SnapshotStore};

/// Owns the fetchers and the store handle; one `refresh` = one full cycle.
pub struct Aggregator {
    fetchers: Vec<Arc<dyn Fetcher>>,
    store: SnapshotStore,
    fetch_timeout: Duration,
    running: Mutex<()>,
}

impl Aggregator {
    pub fn new(fetchers: Vec<Arc<dyn Fetcher>>, store: SnapshotStore, fetch_timeout: Duration) -> Self {
        Self {
            fetchers,
            store,
            fetch_timeout,
            running: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Fetch everything, wait for all sources to settle, merge, publish.
    /// Concurrent callers are serialized.
    pub async fn refresh(&self) -> Arc<AggregationSnapshot> {
        let _guard = self.running.lock().await;

        let outcomes: Vec<SourceOutcome> = run_once(&self.fetchers, self.fetch_timeout).await;
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

        let now = Utc::now();
        let snapshot = merge(outcomes.into_iter().map(SourceOutcome::into_records), now);
        let total = snapshot.total();
        let published = self.store.publish(snapshot);

        counter!("transfers_refresh_total").increment(1);
        gauge!("transfers_last_refresh_ts").set(now.timestamp() as f64);
        tracing::info!(
            target: "ingest",
            sources = self.fetchers.len(),
            failed,
            records = total,
            "snapshot published"
        );
        published
    }
}

/// Cloneable handle for on-demand refreshes. Requests made while a cycle is
/// running collapse into a single follow-up cycle.
#[derive(Clone)]
pub struct RefreshTrigger {
    notify: Arc<Notify>,
}

impl RefreshTrigger {
    pub fn request(&self) {
        self.notify.notify_one();
    }
}

pub struct SchedulerHandle {
    trigger: RefreshTrigger,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Refresh once immediately, then every `interval`, plus whenever triggered.
pub fn spawn_scheduler(aggregator: Arc<Aggregator>, interval: Duration) -> SchedulerHandle {
    let notify = Arc::new(Notify::new());
    let trigger = RefreshTrigger {
        notify: notify.clone(),
    };

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let reason = tokio::select! {
                _ = ticker.tick() => "interval",
                _ = notify.notified() => "on_demand",
            };
            tracing::debug!(target: "ingest", reason, "refresh starting");
            aggregator.refresh().await;
        }
    });

    SchedulerHandle { trigger, task }
}
