//! Core data types for the weather record store
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Timestamp`: The chronological key of an observation
//! - `Observation`: One weather measurement record
//! - `Measurement`: Selector for one of the measured quantities

use chrono::{Month, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Date plus time-of-day, used as the ordering key of an observation.
///
/// Ordering is year, then month, then day, then hour, then minute. Field
/// declaration order matters: the derived `Ord` compares fields top to bottom.
///
/// No range checks are applied. Values such as month 13 are representable;
/// the ingestion parser substitutes [`Timestamp::SENTINEL`] when a date
/// cannot be read at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

impl Timestamp {
    /// `1/1/1900 00:00`, substituted for unparseable date strings
    pub const SENTINEL: Timestamp = Timestamp {
        year: 1900,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
    };

    /// Create a timestamp in the `D/M/Y H:MM` field order of the source files
    pub fn new(day: u32, month: u32, year: i32, hour: u32, minute: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }

    /// Create a timestamp at midnight of the given date
    pub fn date(day: u32, month: u32, year: i32) -> Self {
        Self::new(day, month, year, 0, 0)
    }

    /// Convert to a calendar datetime, if the fields form a real date and time
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(
            self.hour,
            self.minute,
            0,
        )
    }

    /// Whether the fields describe an existing calendar date and time
    pub fn is_calendar_valid(&self) -> bool {
        self.to_naive().is_some()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} {:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute
        )
    }
}

/// English month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    let month = u8::try_from(month).ok()?;
    Month::try_from(month).ok().map(|m| m.name())
}

/// A single weather observation
///
/// Keyed by its [`Timestamp`]: two observations with equal timestamps are the
/// same key for the store even when their measurements differ. The derived
/// `PartialEq` compares every field; use [`Observation::same_key`] or
/// [`Observation::cmp_key`] for key semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Timestamp,
    /// Wind speed in km/h
    pub wind_speed: f64,
    /// Air temperature in degrees C
    pub temperature: f64,
    /// Solar radiation in W/m²
    pub solar_radiation: f64,
}

impl Observation {
    pub fn new(timestamp: Timestamp, wind_speed: f64, temperature: f64, solar_radiation: f64) -> Self {
        Self {
            timestamp,
            wind_speed,
            temperature,
            solar_radiation,
        }
    }

    /// Compare by key only
    pub fn cmp_key(&self, other: &Observation) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }

    /// Whether both observations share the same key
    pub fn same_key(&self, other: &Observation) -> bool {
        self.timestamp == other.timestamp
    }

    pub fn month(&self) -> u32 {
        self.timestamp.month
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year
    }

    /// Read one measured quantity
    pub fn value(&self, measurement: Measurement) -> f64 {
        match measurement {
            Measurement::WindSpeed => self.wind_speed,
            Measurement::Temperature => self.temperature,
            Measurement::SolarRadiation => self.solar_radiation,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | WS: {} | Temp: {} | Solar: {}",
            self.timestamp, self.wind_speed, self.temperature, self.solar_radiation
        )
    }
}

/// The measured quantities carried by an [`Observation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measurement {
    WindSpeed,
    Temperature,
    SolarRadiation,
}

impl Measurement {
    pub fn all() -> &'static [Measurement] {
        &[
            Measurement::WindSpeed,
            Measurement::Temperature,
            Measurement::SolarRadiation,
        ]
    }

    /// Collect this quantity from a slice of observations
    pub fn values(self, observations: &[Observation]) -> Vec<f64> {
        observations.iter().map(|o| o.value(self)).collect()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::WindSpeed => write!(f, "wind_speed"),
            Measurement::Temperature => write!(f, "temperature"),
            Measurement::SolarRadiation => write!(f, "solar_radiation"),
        }
    }
}
