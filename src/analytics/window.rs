//! Resolves a loose range token into a concrete `[start, end)` window, a bucket grain and
//! a bucket mode.
//!
//! Never fails: an unrecognized token behaves like "24 Hour". Labels use chrono's fixed
//! English month/weekday names so charts render the same regardless of locale.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone,
    Timelike,
};
use std::fmt;

/// The range tokens a chart request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeToken {
    Today,
    Last24Hours,
    LastWeek,
    LastMonth,
    Last3Months,
    LastYear,
}

impl RangeToken {
    pub const ALL: [RangeToken; 6] = [
        RangeToken::Today,
        RangeToken::Last24Hours,
        RangeToken::LastWeek,
        RangeToken::LastMonth,
        RangeToken::Last3Months,
        RangeToken::LastYear,
    ];

    /// Parses a range token; anything unrecognized falls back to `Last24Hours`.
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "Today" => RangeToken::Today,
            "24 Hour" => RangeToken::Last24Hours,
            "1 Week" => RangeToken::LastWeek,
            "1 Month" => RangeToken::LastMonth,
            "3 Month" => RangeToken::Last3Months,
            "1 Year" => RangeToken::LastYear,
            _ => RangeToken::Last24Hours,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RangeToken::Today => "Today",
            RangeToken::Last24Hours => "24 Hour",
            RangeToken::LastWeek => "1 Week",
            RangeToken::LastMonth => "1 Month",
            RangeToken::Last3Months => "3 Month",
            RangeToken::LastYear => "1 Year",
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket width of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grain {
    Hour,
    Day,
    Week,
    Month,
}

impl Grain {
    /// `date_trunc` field name. Bound as a query parameter, never spliced into SQL.
    pub fn trunc_unit(self) -> &'static str {
        match self {
            Grain::Hour => "hour",
            Grain::Day => "day",
            Grain::Week => "week",
            Grain::Month => "month",
        }
    }

    /// Truncates a local wall-clock time to the start of its bucket (weeks start Monday).
    pub fn truncate(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        let start_date = match self {
            Grain::Hour => {
                return date.and_hms_opt(t.hour(), 0, 0).unwrap_or(t);
            },
            Grain::Day => date,
            Grain::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Grain::Month => date.with_day(1).unwrap_or(date),
        };
        start_of_day(start_date)
    }

    /// Hourly charts always span the 24 hour-of-day slots; other grains only show buckets
    /// that actually received data.
    pub fn has_fixed_axis(self) -> bool {
        matches!(self, Grain::Hour)
    }

    /// Chart label for a truncated bucket start.
    pub fn label(self, bucket: NaiveDateTime) -> String {
        match self {
            Grain::Hour => bucket.format("%H:00").to_string(),
            Grain::Day => bucket.format("%a %d").to_string(),
            Grain::Week => format!("W{} {}", week_of_month(bucket.date()), bucket.format("%b")),
            Grain::Month => bucket.format("%b %Y").to_string(),
        }
    }
}

/// 1-based week-of-month of the day a bucket starts on.
fn week_of_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

pub(crate) fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// How rows sharing an address and bucket are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketMode {
    /// Most recent sample in the bucket; reflects current conditions.
    Latest,
    /// Mean of all samples in the bucket.
    Average,
}

/// A resolved chart window.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub range: RangeToken,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub grain: Grain,
    pub mode: BucketMode,
}

impl TimeWindow {
    /// Resolves `range` relative to `now`; the offset of `now` is the chart's local zone.
    pub fn resolve(range: RangeToken, now: DateTime<FixedOffset>) -> Self {
        let (start, grain, mode) = match range {
            RangeToken::Today => (local_midnight(now), Grain::Hour, BucketMode::Latest),
            RangeToken::Last24Hours => (now - Duration::hours(24), Grain::Hour, BucketMode::Average),
            RangeToken::LastWeek => (now - Duration::days(7), Grain::Day, BucketMode::Average),
            RangeToken::LastMonth => (months_back(now, 1), Grain::Week, BucketMode::Average),
            RangeToken::Last3Months => (months_back(now, 3), Grain::Month, BucketMode::Average),
            RangeToken::LastYear => (months_back(now, 12), Grain::Month, BucketMode::Average),
        };
        Self {
            range,
            start,
            end: now,
            grain,
            mode,
        }
    }

    /// Trailing year bucketed per day, used by the province heatmap.
    pub fn trailing_year_daily(now: DateTime<FixedOffset>) -> Self {
        Self {
            range: RangeToken::LastYear,
            start: months_back(now, 12),
            end: now,
            grain: Grain::Day,
            mode: BucketMode::Average,
        }
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Seconds east of UTC of the chart's local zone.
    pub fn utc_offset_seconds(&self) -> i32 {
        self.end.offset().local_minus_utc()
    }

    /// Every calendar day touched by the window, oldest first.
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }
}

/// The fixed hour-of-day axis, "00:00" through "23:00".
pub fn hour_labels() -> Vec<String> {
    (0..24).map(|h| format!("{:02}:00", h)).collect()
}

fn local_midnight(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    now.offset()
        .from_local_datetime(&start_of_day(now.date_naive()))
        .single()
        .unwrap_or(now)
}

fn months_back(now: DateTime<FixedOffset>, months: u32) -> DateTime<FixedOffset> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or_else(|| now - Duration::days(30 * i64::from(months)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn naive(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[rstest]
    #[case("Today", RangeToken::Today)]
    #[case("24 Hour", RangeToken::Last24Hours)]
    #[case("1 Week", RangeToken::LastWeek)]
    #[case("1 Month", RangeToken::LastMonth)]
    #[case("3 Month", RangeToken::Last3Months)]
    #[case("1 Year", RangeToken::LastYear)]
    #[case("forever", RangeToken::Last24Hours)]
    #[case("", RangeToken::Last24Hours)]
    fn parses_range_tokens(#[case] token: &str, #[case] expected: RangeToken) {
        assert_eq!(RangeToken::from_token(token), expected);
    }

    #[test]
    fn today_starts_at_local_midnight_and_keeps_latest() {
        let now = at(2024, 3, 10, 14, 25);
        let w = TimeWindow::resolve(RangeToken::Today, now);
        assert_eq!(w.start, at(2024, 3, 10, 0, 0));
        assert_eq!(w.end, now);
        assert_eq!(w.grain, Grain::Hour);
        assert_eq!(w.mode, BucketMode::Latest);
        assert_eq!(w.utc_offset_seconds(), 7 * 3600);
    }

    #[rstest]
    #[case(RangeToken::Last24Hours, at(2024, 3, 9, 14, 25), Grain::Hour)]
    #[case(RangeToken::LastWeek, at(2024, 3, 3, 14, 25), Grain::Day)]
    #[case(RangeToken::LastMonth, at(2024, 2, 10, 14, 25), Grain::Week)]
    #[case(RangeToken::Last3Months, at(2023, 12, 10, 14, 25), Grain::Month)]
    #[case(RangeToken::LastYear, at(2023, 3, 10, 14, 25), Grain::Month)]
    fn trailing_windows_average(
        #[case] range: RangeToken,
        #[case] start: DateTime<FixedOffset>,
        #[case] grain: Grain,
    ) {
        let w = TimeWindow::resolve(range, at(2024, 3, 10, 14, 25));
        assert_eq!(w.start, start);
        assert_eq!(w.grain, grain);
        assert_eq!(w.mode, BucketMode::Average);
        assert!(w.start_millis() < w.end_millis());
    }

    #[test]
    fn month_subtraction_clamps_to_month_end() {
        let w = TimeWindow::resolve(RangeToken::LastMonth, at(2024, 3, 31, 8, 0));
        assert_eq!(w.start, at(2024, 2, 29, 8, 0));
    }

    #[test]
    fn truncation_per_grain() {
        let t = naive(2024, 3, 14, 17) + Duration::minutes(42);
        assert_eq!(Grain::Hour.truncate(t), naive(2024, 3, 14, 17));
        assert_eq!(Grain::Day.truncate(t), naive(2024, 3, 14, 0));
        // 2024-03-14 is a Thursday; its week starts Monday the 11th.
        assert_eq!(Grain::Week.truncate(t), naive(2024, 3, 11, 0));
        assert_eq!(Grain::Month.truncate(t), naive(2024, 3, 1, 0));
    }

    #[test]
    fn labels_are_locale_independent() {
        assert_eq!(Grain::Hour.label(naive(2024, 3, 14, 7)), "07:00");
        assert_eq!(Grain::Day.label(naive(2024, 3, 14, 0)), "Thu 14");
        assert_eq!(Grain::Week.label(naive(2024, 3, 11, 0)), "W2 Mar");
        assert_eq!(Grain::Week.label(naive(2024, 3, 4, 0)), "W1 Mar");
        assert_eq!(Grain::Month.label(naive(2024, 3, 1, 0)), "Mar 2024");
    }

    #[test]
    fn hour_axis_has_24_slots() {
        let labels = hour_labels();
        assert_eq!(labels.len(), 24);
        assert_eq!(labels.first().map(String::as_str), Some("00:00"));
        assert_eq!(labels.last().map(String::as_str), Some("23:00"));
    }

    #[test]
    fn trailing_year_covers_every_day() {
        let w = TimeWindow::trailing_year_daily(at(2024, 3, 10, 14, 25));
        let days = w.days();
        assert_eq!(days.first(), Some(&NaiveDate::from_ymd_opt(2023, 3, 10).unwrap()));
        assert_eq!(days.last(), Some(&NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
        assert_eq!(days.len(), 367);
    }
}
