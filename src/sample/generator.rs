//! Generates sensor readings for a fixed set of monitoring sites.
//!
//! Site addresses are deliberately inconsistent (Thai markers, English names, comma or
//! space delimited, filler words, one Lao site) so the province resolver has real work
//! to do.

use crate::models::SensorReading;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Distribution, Uniform};
use rand::{thread_rng, Rng};
use tracing::debug;

/// A monitoring site and how polluted its air tends to be.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub address: &'static str,
    pub place: Option<&'static str>,
    /// Multiplier on the baseline particulate ranges.
    pub pollution_factor: f64,
}

/// Built-in sites.
pub const SITES: &[Site] = &[
    Site { address: "ต.ช้างเผือก อ.เมือง จ.เชียงใหม่", place: Some("Chang Phueak School"), pollution_factor: 2.2 },
    Site { address: "Nimman Rd, Mueang Chiang Mai, Chiang Mai", place: Some("Nimman"), pollution_factor: 2.0 },
    Site { address: "ถ.พระราม 4 แขวงปทุมวัน เขตปทุมวัน กรุงเทพมหานคร", place: Some("Lumphini Park"), pollution_factor: 1.4 },
    Site { address: "Sukhumvit Soi 11, Bangkok", place: None, pollution_factor: 1.5 },
    Site { address: "ต.สุเทพ จังหวัดลำพูน", place: Some("Hariphunchai"), pollution_factor: 1.8 },
    Site { address: "Moo 5, Nan, Thailand", place: None, pollution_factor: 1.7 },
    Site { address: "ถนนพหลโยธิน, ลำปาง", place: Some("Lampang Station"), pollution_factor: 1.6 },
    Site { address: "Patong; Kathu; Phuket Province", place: Some("Patong Beach"), pollution_factor: 0.6 },
    Site { address: "Ao Nang / Krabi", place: None, pollution_factor: 0.7 },
    Site { address: "ເມືອງໄຊ, ຫຼວງພະບາງ", place: Some("Luang Prabang"), pollution_factor: 1.9 },
];

/// Share of readings whose particulate sensors report 0 ("no data").
const DROPOUT_RATE: f64 = 0.05;

/// Builds random readings over a trailing window.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    sites: Vec<Site>,
    readings_per_site_per_day: u32,
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new(SITES.to_vec())
    }
}

impl SampleGenerator {
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            sites,
            readings_per_site_per_day: 24,
        }
    }

    pub fn with_density(mut self, readings_per_site_per_day: u32) -> Self {
        self.readings_per_site_per_day = readings_per_site_per_day.max(1);
        self
    }

    /// Readings spread randomly over `[now - days, now)`, sorted by timestamp.
    pub fn generate(&self, now: DateTime<Utc>, days: u32) -> Vec<SensorReading> {
        self.generate_with(&mut thread_rng(), now, days)
    }

    pub fn generate_with(&self, rng: &mut impl Rng, now: DateTime<Utc>, days: u32) -> Vec<SensorReading> {
        let days = days.max(1);
        let start = now - Duration::days(i64::from(days));
        let span_millis = (now - start).num_milliseconds();
        let per_site = usize::try_from(days * self.readings_per_site_per_day).unwrap_or(usize::MAX);
        debug!(
            "Generating {} readings for each of {} sites over {} days",
            per_site,
            self.sites.len(),
            days
        );

        let offsets = Uniform::new(0, span_millis.max(1));
        let mut readings = Vec::with_capacity(per_site * self.sites.len());
        for site in &self.sites {
            for _ in 0..per_site {
                let timestamp = start.timestamp_millis() + offsets.sample(rng);
                readings.push(reading_for(site, timestamp, rng));
            }
        }
        readings.sort_by_key(|r| r.timestamp);
        readings
    }
}

fn reading_for(site: &Site, timestamp: i64, rng: &mut impl Rng) -> SensorReading {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    let factor = site.pollution_factor;

    let (pm25, pm10, pm100) = if rng.gen_bool(DROPOUT_RATE) {
        (0.0, 0.0, 0.0)
    } else {
        let pm25 = rng.gen_range(5.0 * factor..35.0 * factor);
        let pm10 = pm25 * rng.gen_range(1.2..1.6);
        (pm25, pm10, pm10 * rng.gen_range(1.1..1.4))
    };

    SensorReading {
        timestamp,
        address: site.address.to_string(),
        place: site.place.map(str::to_string),
        pm25: Some(round1(pm25)),
        pm10: Some(round1(pm10)),
        pm100: Some(round1(pm100)),
        aqi: Some(aqi_from_pm25(pm25).round()),
        temperature: Some(round1(rng.gen_range(21.0..37.0))),
        humidity: Some(round1(rng.gen_range(35.0..95.0))),
    }
}

/// US EPA AQI for a PM2.5 concentration (linear between breakpoints).
pub fn aqi_from_pm25(pm25: f64) -> f64 {
    const BREAKPOINTS: [(f64, f64, f64, f64); 6] = [
        (0.0, 12.0, 0.0, 50.0),
        (12.1, 35.4, 51.0, 100.0),
        (35.5, 55.4, 101.0, 150.0),
        (55.5, 150.4, 151.0, 200.0),
        (150.5, 250.4, 201.0, 300.0),
        (250.5, 500.4, 301.0, 500.0),
    ];
    let c = pm25.max(0.0);
    for (c_lo, c_hi, i_lo, i_hi) in BREAKPOINTS {
        if c <= c_hi {
            let c = c.max(c_lo);
            return (i_hi - i_lo) / (c_hi - c_lo) * (c - c_lo) + i_lo;
        }
    }
    500.0
}
