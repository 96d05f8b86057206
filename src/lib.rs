// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod merge;
pub mod telemetry;
pub mod relevance;
pub mod store;

pub use crate::api::router;
pub use crate::error::FetchError;
pub use crate::ingest::scheduler::{spawn_scheduler, Aggregator, RefreshTrigger, SchedulerHandle};
pub use crate::ingest::types::{SourceKind, TransferRecord};
pub use crate::store::{AggregationSnapshot, SnapshotStore};
