//! The province-aware aggregation and ranking engines.
//!
//! `window` resolves range tokens into concrete windows, `chart` builds gap-filled
//! per-province series (and the yearly heatmap), `ranking` ranks one day's groups.
//! Each request is independent and makes a single reading-store round trip.

mod chart;
mod ranking;
mod window;

pub use chart::{aggregate, heatmap, ChartRequest};
pub use ranking::{rank, ranking_today, RankRequest};
pub use window::{BucketMode, Grain, RangeToken, TimeWindow};
