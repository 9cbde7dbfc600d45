//! Input-side data structures: raw sensor rows, the rows the store hands back,
//! and the closed sets of metrics and grouping dimensions callers may ask for.

use crate::error::{AppError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One row per device per sampling instant, as persisted in `sensor_data`.
///
/// Also the interchange format of JSON readings files used by `MemoryStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sampling instant in Unix milliseconds.
    pub timestamp: i64,
    /// Free-form, inconsistently formatted address text.
    pub address: String,
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub pm100: Option<f64>,
    #[serde(default)]
    pub aqi: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

impl SensorReading {
    /// Creates a reading carrying a single metric value.
    pub fn new(timestamp: i64, address: impl Into<String>, metric: Metric, value: f64) -> Self {
        let mut reading = Self {
            timestamp,
            address: address.into(),
            place: None,
            pm25: None,
            pm10: None,
            pm100: None,
            aqi: None,
            temperature: None,
            humidity: None,
        };
        reading.set_value(metric, Some(value));
        reading
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Pm25 => self.pm25,
            Metric::Pm10 => self.pm10,
            Metric::Pm100 => self.pm100,
            Metric::Aqi => self.aqi,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }

    pub fn set_value(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Pm25 => &mut self.pm25,
            Metric::Pm10 => &mut self.pm10,
            Metric::Pm100 => &mut self.pm100,
            Metric::Aqi => &mut self.aqi,
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
        };
        *slot = value;
    }
}

/// A store-side aggregated (or latest-per-bucket) row.
///
/// `bucket` is the truncated local wall-clock time of the bucket start.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BucketedReading {
    pub address: String,
    pub bucket: NaiveDateTime,
    pub value: f64,
}

/// Per-group mean and sample count for one ranking day, before ranking.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GroupAverage {
    pub key: Option<String>,
    pub average: Option<f64>,
    pub count: i64,
}

/// The metrics a chart or ranking can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Pm25,
    Pm10,
    Pm100,
    Aqi,
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Pm25,
        Metric::Pm10,
        Metric::Pm100,
        Metric::Aqi,
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Column holding this metric in `sensor_data`. Closed set, safe to splice into SQL.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Pm25 => "pm25",
            Metric::Pm10 => "pm10",
            Metric::Pm100 => "pm100",
            Metric::Aqi => "aqi",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.column()
    }

    /// Unit shown next to values in tables.
    pub fn unit(self) -> &'static str {
        match self {
            Metric::Pm25 | Metric::Pm10 | Metric::Pm100 => "µg/m³",
            Metric::Aqi => "",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
        }
    }
}

impl FromStr for Metric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pm25" | "pm2.5" => Ok(Metric::Pm25),
            "pm10" => Ok(Metric::Pm10),
            "pm100" => Ok(Metric::Pm100),
            "aqi" => Ok(Metric::Aqi),
            "temp" | "temperature" => Ok(Metric::Temperature),
            "humidity" => Ok(Metric::Humidity),
            other => Err(AppError::invalid(format!(
                "unknown metric '{}' (expected one of pm25, pm10, pm100, aqi, temperature, humidity)",
                other
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a daily ranking groups readings by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupDimension {
    /// The raw address string.
    Address,
    /// The optional `place` attribute.
    Place,
    /// Last whitespace-delimited word of the trimmed address.
    Province,
}

impl GroupDimension {
    pub const ALL: [GroupDimension; 3] = [
        GroupDimension::Address,
        GroupDimension::Place,
        GroupDimension::Province,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GroupDimension::Address => "address",
            GroupDimension::Place => "place",
            GroupDimension::Province => "province",
        }
    }
}

impl FromStr for GroupDimension {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "address" => Ok(GroupDimension::Address),
            "place" => Ok(GroupDimension::Place),
            "province" => Ok(GroupDimension::Province),
            other => Err(AppError::invalid(format!(
                "unknown group '{}' (expected address, place or province)",
                other
            ))),
        }
    }
}

impl fmt::Display for GroupDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pm25", Metric::Pm25)]
    #[case("PM2.5", Metric::Pm25)]
    #[case("pm10", Metric::Pm10)]
    #[case("pm100", Metric::Pm100)]
    #[case("AQI", Metric::Aqi)]
    #[case("temp", Metric::Temperature)]
    #[case(" temperature ", Metric::Temperature)]
    #[case("humidity", Metric::Humidity)]
    fn parses_known_metrics(#[case] input: &str, #[case] expected: Metric) {
        assert_eq!(input.parse::<Metric>().unwrap(), expected);
    }

    #[rstest]
    #[case("co2")]
    #[case("")]
    #[case("pm 25")]
    fn rejects_unknown_metrics(#[case] input: &str) {
        let err = input.parse::<Metric>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn group_dimension_parsing() {
        assert_eq!("Province".parse::<GroupDimension>().unwrap(), GroupDimension::Province);
        assert_eq!("place".parse::<GroupDimension>().unwrap(), GroupDimension::Place);
        assert!("district".parse::<GroupDimension>().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn reading_value_follows_metric() {
        let mut r = SensorReading::new(0, "x", Metric::Humidity, 61.0);
        assert_eq!(r.value(Metric::Humidity), Some(61.0));
        assert_eq!(r.value(Metric::Pm25), None);
        r.set_value(Metric::Pm25, Some(12.5));
        assert_eq!(r.value(Metric::Pm25), Some(12.5));
    }

    #[test]
    fn reading_deserializes_with_missing_metrics() {
        let r: SensorReading =
            serde_json::from_str(r#"{"timestamp": 1, "address": "Chiang Mai", "pm25": 9.5}"#)
                .unwrap();
        assert_eq!(r.pm25, Some(9.5));
        assert_eq!(r.place, None);
        assert_eq!(r.humidity, None);
    }
}
