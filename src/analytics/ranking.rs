//! Daily ranking of groups (address, place or province) by mean metric value.
//!
//! The ranking day is always a calendar day in UTC+7, independent of the zone charts use.
//! Province grouping here is the last whitespace-delimited word of the trimmed address,
//! which is deliberately simpler than `province::derive_from_address`: "Mueang Chiang Mai"
//! ranks under "Mai".

use crate::db::{RankQuery, ReadingStore};
use crate::error::{AppError, Result};
use crate::models::{DailyRankRow, GroupAverage, GroupDimension, Metric};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Offset of the ranking day.
pub const RANKING_UTC_OFFSET_SECS: i32 = 7 * 3600;

pub fn ranking_zone() -> FixedOffset {
    FixedOffset::east_opt(RANKING_UTC_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// Today's date in the ranking zone.
pub fn ranking_today() -> NaiveDate {
    Utc::now().with_timezone(&ranking_zone()).date_naive()
}

/// A validated ranking request.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub date: NaiveDate,
    pub metric: Metric,
    pub group: GroupDimension,
    pub limit: usize,
}

impl RankRequest {
    /// Validates loose caller input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` for a date not in `YYYY-MM-DD` form, an unknown
    /// metric or group dimension, or `limit < 1`. Callers are expected to clamp the limit
    /// to 1..=100 before this point.
    pub fn parse(date: &str, metric: &str, group: &str, limit: i64) -> Result<Self> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|e| AppError::invalid(format!("invalid date '{}': {}", date, e)))?;
        if limit < 1 {
            return Err(AppError::invalid(format!("limit must be at least 1, got {}", limit)));
        }
        Ok(Self {
            date,
            metric: metric.parse()?,
            group: group.parse()?,
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
        })
    }

    /// `[local midnight, local midnight + 24h)` of the ranking day.
    pub fn day_window(&self) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        day_window(self.date)
    }
}

pub fn day_window(date: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let zone = ranking_zone();
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let start = zone.from_utc_datetime(&(midnight - Duration::seconds(i64::from(RANKING_UTC_OFFSET_SECS))));
    (start, start + Duration::hours(24))
}

/// Ranks one day's groups.
///
/// # Errors
///
/// Returns `AppError::StoreUnavailable` if the reading store fails.
pub async fn rank(store: &dyn ReadingStore, request: &RankRequest) -> Result<Vec<DailyRankRow>> {
    let (start, end) = request.day_window();
    info!(
        "Ranking {} by {} on {} (top {})",
        request.group, request.metric, request.date, request.limit
    );

    let query = RankQuery {
        start_millis: start.timestamp_millis(),
        end_millis: end.timestamp_millis(),
        metric: request.metric,
        group: request.group,
    };
    let groups = store.daily_group_averages(&query).await?;
    debug!("Store returned {} group averages", groups.len());

    Ok(rank_groups(groups, request))
}

/// Orders groups by average descending (key ascending among equals), assigns
/// standard competition ranks ("1224") and keeps the top `limit`.
///
/// Groups without a key or without any usable value are dropped.
pub fn rank_groups(groups: Vec<GroupAverage>, request: &RankRequest) -> Vec<DailyRankRow> {
    let mut usable: Vec<(String, f64, i64)> = groups
        .into_iter()
        .filter_map(|g| {
            let key = g.key.filter(|k| !k.trim().is_empty())?;
            let average = g.average.filter(|a| a.is_finite())?;
            (g.count > 0).then_some((key, average, g.count))
        })
        .collect();
    usable.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let date = request.date.format("%Y-%m-%d").to_string();
    let mut rows = Vec::with_capacity(usable.len().min(request.limit));
    let mut previous: Option<f64> = None;
    let mut rank = 0u32;
    for (position, (key, average, count)) in usable.into_iter().enumerate() {
        if position >= request.limit {
            break;
        }
        if previous != Some(average) {
            rank = u32::try_from(position + 1).unwrap_or(u32::MAX);
            previous = Some(average);
        }
        rows.push(DailyRankRow {
            key,
            average,
            rank,
            count,
            date: date.clone(),
            metric: request.metric.as_str().to_string(),
            group: request.group.as_str().to_string(),
        });
    }
    rows
}
