//! In-process `ReadingStore` over a vector of readings.
//!
//! Mirrors the SQL the PostgreSQL store runs, including `ILIKE` pattern matching and the
//! last-word province key, so offline runs and tests see what production would.

use super::{BucketQuery, RankQuery, ReadingStore};
use crate::analytics::BucketMode;
use crate::error::Result;
use crate::models::{BucketedReading, GroupAverage, GroupDimension, SensorReading};
use crate::province::last_word_province;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// A reading store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    readings: Vec<SensorReading>,
}

impl MemoryStore {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        Self { readings }
    }

    /// Loads a JSON array of readings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read and `AppError::JsonParse` if it
    /// is not a JSON array of readings.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let readings: Vec<SensorReading> = serde_json::from_str(&content)?;
        info!("Loaded {} readings from {}", readings.len(), path.display());
        Ok(Self::new(readings))
    }

    /// Writes the readings as a pretty-printed JSON array.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, serde_json::to_string_pretty(&self.readings)?)?;
        info!("Wrote {} readings to {}", self.readings.len(), path.display());
        Ok(())
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn extend(&mut self, readings: impl IntoIterator<Item = SensorReading>) {
        self.readings.extend(readings);
    }

    fn in_window(&self, start: i64, end: i64) -> impl Iterator<Item = &SensorReading> {
        self.readings
            .iter()
            .filter(move |r| r.timestamp >= start && r.timestamp < end)
    }
}

/// Local wall-clock time of a Unix-millis instant.
fn local_time(millis: i64, utc_offset_seconds: i32) -> Option<NaiveDateTime> {
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)?.naive_utc();
    Some(utc + Duration::seconds(i64::from(utc_offset_seconds)))
}

/// Case-insensitive SQL `LIKE` matching with `\` as the escape character.
pub fn like_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    like_from(&pattern, &text)
}

fn like_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('%', rest)) => (0..=text.len()).any(|skip| like_from(rest, &text[skip..])),
        Some(('_', rest)) => !text.is_empty() && like_from(rest, &text[1..]),
        Some(('\\', rest)) if !rest.is_empty() => {
            text.first() == Some(&rest[0]) && like_from(&rest[1..], &text[1..])
        },
        Some((c, rest)) => text.first() == Some(c) && like_from(rest, &text[1..]),
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn bucketed_readings(&self, query: &BucketQuery) -> Result<Vec<BucketedReading>> {
        // (address, bucket) -> (sum, count) for averages, (timestamp, value) for latest.
        let mut sums: BTreeMap<(String, NaiveDateTime), (f64, u32)> = BTreeMap::new();
        let mut latest: BTreeMap<(String, NaiveDateTime), (i64, f64)> = BTreeMap::new();

        for reading in self.in_window(query.start_millis, query.end_millis) {
            let Some(value) = reading.value(query.metric) else {
                continue;
            };
            if !query.address_patterns.is_empty()
                && !query
                    .address_patterns
                    .iter()
                    .any(|p| like_matches(p, &reading.address))
            {
                continue;
            }
            let Some(local) = local_time(reading.timestamp, query.utc_offset_seconds) else {
                continue;
            };
            let key = (reading.address.clone(), query.grain.truncate(local));
            match query.mode {
                BucketMode::Average => {
                    let entry = sums.entry(key).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                },
                BucketMode::Latest => {
                    let entry = latest.entry(key).or_insert((reading.timestamp, value));
                    if reading.timestamp >= entry.0 {
                        *entry = (reading.timestamp, value);
                    }
                },
            }
        }

        let rows: Vec<BucketedReading> = match query.mode {
            BucketMode::Average => sums
                .into_iter()
                .map(|((address, bucket), (sum, count))| BucketedReading {
                    address,
                    bucket,
                    value: sum / f64::from(count),
                })
                .collect(),
            BucketMode::Latest => latest
                .into_iter()
                .map(|((address, bucket), (_, value))| BucketedReading {
                    address,
                    bucket,
                    value,
                })
                .collect(),
        };
        debug!("Memory store produced {} bucketed rows", rows.len());
        Ok(rows)
    }

    async fn daily_group_averages(&self, query: &RankQuery) -> Result<Vec<GroupAverage>> {
        let mut groups: BTreeMap<String, (f64, i64)> = BTreeMap::new();
        for reading in self.in_window(query.start_millis, query.end_millis) {
            let Some(value) = reading.value(query.metric).filter(|v| *v != 0.0) else {
                continue;
            };
            let key = match query.group {
                GroupDimension::Address => Some(reading.address.as_str()),
                GroupDimension::Place => reading.place.as_deref(),
                GroupDimension::Province => last_word_province(&reading.address),
            };
            let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
                continue;
            };
            let entry = groups.entry(key.to_string()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(key, (sum, count))| GroupAverage {
                key: Some(key),
                average: Some(sum / count as f64),
                count,
            })
            .collect())
    }
}
