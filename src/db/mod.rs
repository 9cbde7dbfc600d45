//! The reading store seam and its two implementations.
//!
//! The engines only ever talk to `ReadingStore`. `Database` answers it from PostgreSQL
//! via `sqlx`; `MemoryStore` answers it from an in-process vector of readings (JSON
//! readings files, tests) with the same window, bucketing and filtering semantics.

mod memory;
mod postgres;

pub use memory::*;
pub use postgres::*;

use crate::analytics::{BucketMode, Grain, TimeWindow};
use crate::error::Result;
use crate::models::{BucketedReading, GroupAverage, GroupDimension, Metric};
use async_trait::async_trait;

/// Parameters of one bucketed chart query.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketQuery {
    /// Inclusive lower bound, Unix millis.
    pub start_millis: i64,
    /// Exclusive upper bound, Unix millis.
    pub end_millis: i64,
    pub grain: Grain,
    pub mode: BucketMode,
    pub metric: Metric,
    /// `ILIKE` substring patterns, OR'd together. Empty means no address filter.
    pub address_patterns: Vec<String>,
    /// Offset used to turn instants into local wall-clock buckets.
    pub utc_offset_seconds: i32,
}

impl BucketQuery {
    pub fn for_window(window: &TimeWindow, metric: Metric, address_patterns: Vec<String>) -> Self {
        Self {
            start_millis: window.start_millis(),
            end_millis: window.end_millis(),
            grain: window.grain,
            mode: window.mode,
            metric,
            address_patterns,
            utc_offset_seconds: window.utc_offset_seconds(),
        }
    }
}

/// Parameters of one daily ranking query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankQuery {
    pub start_millis: i64,
    pub end_millis: i64,
    pub metric: Metric,
    pub group: GroupDimension,
}

/// The one capability the engines need from persistence.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Readings in `[start, end)` whose address matches any pattern, collapsed per
    /// `(address, bucket)` by `mode`. Null metric values are ignored.
    async fn bucketed_readings(&self, query: &BucketQuery) -> Result<Vec<BucketedReading>>;

    /// Per-group average and count over `[start, end)`, counting only non-null, non-zero
    /// values and skipping null or empty group keys.
    async fn daily_group_averages(&self, query: &RankQuery) -> Result<Vec<GroupAverage>>;
}
