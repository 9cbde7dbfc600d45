//! Windowed, province-aware chart aggregation.
//!
//! One request makes exactly one store round trip. Rows come back already bucketed (and
//! averaged, or latest-per-bucket for "Today"); this module attributes each row to a
//! province, folds rows into per-province bucket means, and lays the means out against
//! a label axis with zero-filled gaps. Dropping the returned future cancels the store
//! call and discards everything accumulated so far.

use super::window::{hour_labels, start_of_day, Grain, RangeToken, TimeWindow};
use crate::db::{BucketQuery, ReadingStore};
use crate::error::{AppError, Result};
use crate::models::{BucketedReading, ChartSeries, Dataset, Metric};
use crate::province::{derive_from_address, fuzzy_equals, match_filters, match_strength, MatchStrength};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A chart request as the engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub range: RangeToken,
    /// Optional province filter, kept as the caller typed it (it becomes the dataset label).
    pub province: Option<String>,
    pub metric: Metric,
}

impl ChartRequest {
    /// Builds a request from loose caller input. Only the metric can be rejected.
    pub fn parse(range: &str, province: Option<&str>, metric: &str) -> Result<Self> {
        Ok(Self {
            range: RangeToken::from_token(range),
            province: province
                .filter(|p| !p.trim().is_empty())
                .map(str::to_string),
            metric: metric.parse()?,
        })
    }
}

/// Position of a bucket on a chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Slot {
    /// Hour-of-day 0..=23; hourly windows fold every day's hour H into one slot.
    HourOfDay(u32),
    /// Truncated local bucket start for day, week and month grains.
    Bucket(NaiveDateTime),
}

impl Slot {
    fn of(grain: Grain, bucket: NaiveDateTime) -> Self {
        if grain.has_fixed_axis() {
            Slot::HourOfDay(bucket.hour())
        } else {
            Slot::Bucket(grain.truncate(bucket))
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct RunningMean {
    sum: f64,
    count: u32,
}

impl RunningMean {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            round2(self.sum / f64::from(self.count))
        }
    }
}

/// Rounds to two decimals, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

type Buckets = BTreeMap<Slot, RunningMean>;
type SeriesMap = BTreeMap<String, Buckets>;

/// Derives a province for every row in parallel and folds the rows into per-province
/// slot means. Rows whose address yields no province are dropped.
fn accumulate(rows: &[BucketedReading], grain: Grain) -> SeriesMap {
    let provinces: Vec<String> = rows
        .par_iter()
        .map(|row| derive_from_address(&row.address))
        .collect();

    let mut series = SeriesMap::new();
    let mut dropped = 0usize;
    for (row, province) in rows.iter().zip(provinces) {
        if province.is_empty() {
            dropped += 1;
            continue;
        }
        series
            .entry(province)
            .or_default()
            .entry(Slot::of(grain, row.bucket))
            .or_default()
            .add(row.value);
    }
    if dropped > 0 {
        debug!("Skipped {} rows whose address names no province", dropped);
    }
    series
}

fn values_on_axis(axis: &[Slot], buckets: &Buckets) -> Vec<f64> {
    axis.iter()
        .map(|slot| buckets.get(slot).map(RunningMean::mean).unwrap_or(0.0))
        .collect()
}

/// Picks the one series a filter asks for: an exact name or alias match first, then the
/// first fuzzy match in name order.
fn best_match<'a>(series: &'a SeriesMap, target: &str) -> Option<(&'a str, &'a Buckets)> {
    series
        .iter()
        .find(|(name, _)| match_strength(name, target) == Some(MatchStrength::Exact))
        .or_else(|| series.iter().find(|(name, _)| fuzzy_equals(name, target)))
        .map(|(name, buckets)| (name.as_str(), buckets))
}

/// The hour-of-day axis for hourly grains, otherwise the chronological union of the
/// buckets present in `series`.
fn axis_of<'a>(grain: Grain, series: impl Iterator<Item = &'a Buckets>) -> Vec<Slot> {
    if grain.has_fixed_axis() {
        return (0..24).map(Slot::HourOfDay).collect();
    }
    series
        .flat_map(|buckets| buckets.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn labels_of(grain: Grain, axis: &[Slot]) -> Vec<String> {
    if grain.has_fixed_axis() {
        return hour_labels();
    }
    axis.iter()
        .map(|slot| match slot {
            Slot::Bucket(bucket) => grain.label(*bucket),
            Slot::HourOfDay(h) => format!("{:02}:00", h),
        })
        .collect()
}

/// One dataset labelled with the filter text, all zeros when nothing was selected.
fn filter_dataset(selected: Option<(&str, &Buckets)>, axis: &[Slot], filter: &str) -> Dataset {
    match selected {
        Some((province, buckets)) => {
            debug!("Filter '{}' selected province '{}'", filter, province);
            Dataset {
                label: filter.to_string(),
                values: values_on_axis(axis, buckets),
            }
        },
        None => {
            debug!("No aggregated series matches filter '{}'", filter);
            Dataset::zeroed(filter, axis.len())
        },
    }
}

/// Aggregates one chart: time window, optional province filter, metric.
///
/// Every row is attributed to the province derived from its address. Without a filter
/// every province gets a dataset, sorted by name. With a filter the single best-matching
/// province is kept, labelled with the filter text, all zeros when nothing matched.
/// Hourly grains always carry the 24 hour labels; other grains carry the chronological
/// union of buckets that received data (possibly none) in the charted series.
///
/// # Errors
///
/// Returns `AppError::StoreUnavailable` if the reading store fails. Sparse or missing
/// data is never an error.
pub async fn aggregate(
    store: &dyn ReadingStore,
    request: &ChartRequest,
    now: DateTime<FixedOffset>,
) -> Result<ChartSeries> {
    let window = TimeWindow::resolve(request.range, now);
    let filter = request.province.as_deref();
    let patterns = filter.map(match_filters).unwrap_or_default();
    info!(
        "Aggregating {} chart over '{}' ({} .. {}), province filter: {:?}",
        request.metric, window.range, window.start, window.end, filter
    );

    let query = BucketQuery::for_window(&window, request.metric, patterns);
    let rows = store.bucketed_readings(&query).await?;
    debug!("Store returned {} bucketed rows", rows.len());

    let grain = window.grain;
    let series = accumulate(&rows, grain);

    let chart = match filter {
        Some(f) => {
            let selected = best_match(&series, f);
            let axis = axis_of(grain, selected.map(|(_, buckets)| buckets).into_iter());
            ChartSeries {
                labels: labels_of(grain, &axis),
                datasets: vec![filter_dataset(selected, &axis, f)],
            }
        },
        None => {
            let axis = axis_of(grain, series.values());
            ChartSeries {
                labels: labels_of(grain, &axis),
                datasets: series
                    .iter()
                    .map(|(province, buckets)| Dataset {
                        label: province.clone(),
                        values: values_on_axis(&axis, buckets),
                    })
                    .collect(),
            }
        },
    };
    debug_assert!(chart.is_aligned());
    Ok(chart)
}

/// Daily means for one province over the trailing year, one label per calendar day.
///
/// # Errors
///
/// Returns `AppError::InvalidArgument` for a blank province and
/// `AppError::StoreUnavailable` if the reading store fails.
pub async fn heatmap(
    store: &dyn ReadingStore,
    province: &str,
    metric: Metric,
    now: DateTime<FixedOffset>,
) -> Result<ChartSeries> {
    if province.trim().is_empty() {
        return Err(AppError::invalid("province is required for the heatmap"));
    }
    let window = TimeWindow::trailing_year_daily(now);
    info!(
        "Building {} heatmap for '{}' ({} .. {})",
        metric, province, window.start, window.end
    );

    let query = BucketQuery::for_window(&window, metric, match_filters(province));
    let rows = store.bucketed_readings(&query).await?;
    debug!("Store returned {} daily rows", rows.len());

    let series = accumulate(&rows, window.grain);
    let days = window.days();
    let axis: Vec<Slot> = days.iter().map(|d| Slot::Bucket(start_of_day(*d))).collect();
    Ok(ChartSeries {
        labels: days.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        datasets: vec![filter_dataset(best_match(&series, province), &axis, province)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::SensorReading;
    use chrono::{Duration, TimeZone};

    fn bkk() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        bkk().with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn reading(at: DateTime<FixedOffset>, address: &str, value: f64) -> SensorReading {
        SensorReading::new(at.timestamp_millis(), address, Metric::Pm25, value)
    }

    #[tokio::test]
    async fn last_24_hours_splits_by_derived_province() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 9, 15), "123 Rd, จ.เชียงใหม่", 20.0),
            reading(local(2024, 3, 10, 10, 5), "45 Rd, Bangkok", 30.0),
        ]);
        let request = ChartRequest::parse("24 Hour", None, "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.labels.len(), 24);
        assert!(chart.is_aligned());
        let labels: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["กรุงเทพมหานคร", "เชียงใหม่"]);

        let bangkok = &chart.datasets[0].values;
        let chiang_mai = &chart.datasets[1].values;
        assert_eq!(bangkok[10], 30.0);
        assert_eq!(chiang_mai[9], 20.0);
        assert_eq!(bangkok.iter().filter(|v| **v != 0.0).count(), 1);
        assert_eq!(chiang_mai.iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[tokio::test]
    async fn today_with_unmatched_filter_is_all_zeros() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![reading(local(2024, 3, 10, 8, 0), "Phuket", 12.0)]);
        let request = ChartRequest::parse("Today", Some("Chiang Mai"), "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.labels, hour_labels());
        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].label, "Chiang Mai");
        assert_eq!(chart.datasets[0].values, vec![0.0; 24]);
    }

    #[tokio::test]
    async fn today_keeps_latest_sample_per_hour() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 7, 5), "ถ.ห้วยแก้ว จ.เชียงใหม่", 10.0),
            reading(local(2024, 3, 10, 7, 50), "ถ.ห้วยแก้ว จ.เชียงใหม่", 40.0),
            // Yesterday, outside "Today".
            reading(local(2024, 3, 9, 7, 55), "ถ.ห้วยแก้ว จ.เชียงใหม่", 99.0),
        ]);
        let request = ChartRequest::parse("Today", Some("chiang mai"), "pm2.5").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.datasets[0].label, "chiang mai");
        assert_eq!(chart.datasets[0].values[7], 40.0);
        assert_eq!(chart.datasets[0].values.iter().sum::<f64>(), 40.0);
    }

    #[tokio::test]
    async fn filter_charts_only_the_selected_province() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 11, 0), "Nimman Rd, Chiang Mai", 10.0),
            // Matches the "chiang mai" pattern but derives to Lamphun.
            reading(local(2024, 3, 10, 11, 5), "Chiang Mai-Lamphun Rd, Lamphun", 50.0),
        ]);
        let request = ChartRequest::parse("24 Hour", Some("Chiang Mai"), "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].label, "Chiang Mai");
        assert_eq!(chart.datasets[0].values[11], 10.0);
        assert_eq!(chart.datasets[0].values.iter().sum::<f64>(), 10.0);
    }

    #[tokio::test]
    async fn partial_filter_picks_one_province_instead_of_averaging() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 11, 0), "Nimman Rd, Chiang Mai", 10.0),
            reading(local(2024, 3, 10, 11, 0), "Mae Sai, Chiang Rai", 30.0),
        ]);
        let request = ChartRequest::parse("24 Hour", Some("Chiang"), "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].label, "Chiang");
        // Both match partially; the first in name order (เชียงราย) wins.
        assert_eq!(chart.datasets[0].values[11], 30.0);
    }

    #[tokio::test]
    async fn filtered_axis_only_carries_the_selected_buckets() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 8, 9, 0), "Nimman Rd, Chiang Mai", 10.0),
            reading(local(2024, 3, 5, 9, 0), "Chiang Mai-Lamphun Rd, Lamphun", 30.0),
        ]);
        let request = ChartRequest::parse("1 Week", Some("Chiang Mai"), "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.labels, vec!["Fri 08"]);
        assert_eq!(chart.datasets[0].values, vec![10.0]);
    }

    #[tokio::test]
    async fn hourly_means_are_rounded_half_away_from_zero() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 11, 0), "Lampang", 10.0),
            reading(local(2024, 3, 10, 11, 10), "Lampang", 10.0),
            reading(local(2024, 3, 10, 11, 20), "Lampang", 10.025),
            reading(local(2024, 3, 10, 11, 20), "Nan", 1.0 / 3.0),
        ]);
        let request = ChartRequest::parse("24 Hour", None, "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        let nan = chart.datasets.iter().find(|d| d.label == "น่าน").unwrap();
        assert_eq!(nan.values[11], 0.33);
        let lampang = chart.datasets.iter().find(|d| d.label == "ลำปาง").unwrap();
        assert_eq!(lampang.values[11], 10.01);
    }

    #[tokio::test]
    async fn unattributable_addresses_are_excluded() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 10, 11, 0), "District, City, Region", 50.0),
            reading(local(2024, 3, 10, 11, 0), "Lamphun", 5.0),
        ]);
        let request = ChartRequest::parse("24 Hour", None, "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.datasets.len(), 1);
        assert_eq!(chart.datasets[0].label, "ลำพูน");
    }

    #[tokio::test]
    async fn empty_store_keeps_hour_axis_but_drops_other_axes() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(Vec::new());

        let hourly = aggregate(&store, &ChartRequest::parse("24 Hour", None, "pm25").unwrap(), now)
            .await
            .unwrap();
        assert_eq!(hourly.labels.len(), 24);
        assert!(hourly.datasets.is_empty());

        let weekly = aggregate(&store, &ChartRequest::parse("1 Week", None, "pm25").unwrap(), now)
            .await
            .unwrap();
        assert!(weekly.labels.is_empty());
        assert!(weekly.datasets.is_empty());
    }

    #[tokio::test]
    async fn weekly_range_uses_union_of_daily_buckets() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(local(2024, 3, 8, 9, 0), "Trang", 10.0),
            reading(local(2024, 3, 8, 15, 0), "Trang", 20.0),
            reading(local(2024, 3, 5, 9, 0), "Yala", 7.0),
        ]);
        let request = ChartRequest::parse("1 Week", None, "pm25").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.labels, vec!["Tue 05", "Fri 08"]);
        let trang = chart.datasets.iter().find(|d| d.label == "ตรัง").unwrap();
        assert_eq!(trang.values, vec![0.0, 15.0]);
        let yala = chart.datasets.iter().find(|d| d.label == "ยะลา").unwrap();
        assert_eq!(yala.values, vec![7.0, 0.0]);
        assert!(chart.is_aligned());
    }

    #[tokio::test]
    async fn metric_selects_the_charted_column() {
        let now = local(2024, 3, 10, 12, 30);
        let mut r = reading(local(2024, 3, 10, 11, 0), "Krabi", 12.0);
        r.humidity = Some(80.0);
        let store = MemoryStore::new(vec![r]);
        let request = ChartRequest::parse("24 Hour", Some("Krabi"), "humidity").unwrap();

        let chart = aggregate(&store, &request, now).await.unwrap();

        assert_eq!(chart.datasets[0].values[11], 80.0);
    }

    #[test]
    fn unknown_metric_is_rejected_before_any_query() {
        let err = ChartRequest::parse("24 Hour", None, "co2").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn blank_filter_means_no_filter() {
        let request = ChartRequest::parse("nonsense", Some("   "), "pm25").unwrap();
        assert_eq!(request.province, None);
        assert_eq!(request.range, RangeToken::Last24Hours);
    }

    #[tokio::test]
    async fn heatmap_fills_every_day_of_the_year() {
        let now = local(2024, 3, 10, 12, 30);
        let store = MemoryStore::new(vec![
            reading(now - Duration::days(1), "ต.ช้างเผือก จ.เชียงใหม่", 30.0),
            reading(now - Duration::days(1) + Duration::hours(1), "Chiang Mai", 10.0),
            reading(now - Duration::days(2), "Phuket", 50.0),
        ]);

        let chart = heatmap(&store, "Chiang Mai", Metric::Pm25, now).await.unwrap();

        assert_eq!(chart.labels.len(), 367);
        assert_eq!(chart.labels.last().map(String::as_str), Some("2024-03-10"));
        let yesterday = chart.labels.iter().position(|l| l == "2024-03-09").unwrap();
        assert_eq!(chart.datasets[0].values[yesterday], 20.0);
        assert_eq!(chart.datasets[0].values.iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[tokio::test]
    async fn heatmap_requires_a_province() {
        let store = MemoryStore::new(Vec::new());
        let err = heatmap(&store, "  ", Metric::Pm25, local(2024, 3, 10, 0, 0))
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn round2_behaviour() {
        assert_eq!(round2(2.675_000_1), 2.68);
        assert_eq!(round2(-1.005_000_1), -1.01);
        assert_eq!(round2(15.0), 15.0);
    }
}
