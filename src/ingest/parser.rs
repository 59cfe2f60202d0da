//! Row Parsing
//!
//! Turns one delimited source row into an [`Observation`].
//!
//! Date/time strings look like `31/12/2010 9:00`. Parsing degrades instead
//! of failing:
//! - no space between date and time, or unreadable date → `1/1/1900 00:00`
//! - readable date, unreadable time → that date at `00:00`
//!
//! Numeric fields equal to the missing token (default `N/A`) read as 0.0.
//! Any other non-numeric field rejects the row.

use crate::storage::{Observation, Timestamp};
use csv::StringRecord;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Token marking a value the station did not record
pub const MISSING_TOKEN: &str = "N/A";

/// Column positions of the consumed fields in a source row
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceLayout {
    /// Combined `D/M/Y H:MM` field
    pub timestamp_column: usize,
    pub wind_speed_column: usize,
    pub solar_radiation_column: usize,
    pub temperature_column: usize,
    /// Rows with fewer fields are rejected
    pub min_fields: usize,
    pub missing_token: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            timestamp_column: 0,
            wind_speed_column: 10,
            solar_radiation_column: 11,
            temperature_column: 17,
            min_fields: 18,
            missing_token: MISSING_TOKEN.to_string(),
        }
    }
}

impl SourceLayout {
    /// Field count a row needs to be considered: `min_fields`, raised if a
    /// configured column lies beyond it
    pub fn required_fields(&self) -> usize {
        [
            self.timestamp_column,
            self.wind_speed_column,
            self.solar_radiation_column,
            self.temperature_column,
        ]
        .into_iter()
        .map(|c| c + 1)
        .fold(self.min_fields, usize::max)
    }
}

/// Why a row was rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("expected at least {required} fields, found {found}")]
    TooFewFields { found: usize, required: usize },

    #[error("column {column}: {value:?} is not a number")]
    InvalidNumber { column: usize, value: String },

    #[error("unreadable row: {0}")]
    Unreadable(String),
}

impl From<csv::Error> for RowError {
    fn from(err: csv::Error) -> Self {
        RowError::Unreadable(err.to_string())
    }
}

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)/(\d+)/([+-]?\d+)").ok())
        .as_ref()
}

fn time_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*(\d+)\s*:\s*(\d+)").ok())
        .as_ref()
}

/// Parse `D/M/Y`; trailing characters after the year are ignored
fn parse_date(s: &str) -> Option<(u32, u32, i32)> {
    let caps = date_pattern()?.captures(s)?;
    Some((
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        caps.get(3)?.as_str().parse().ok()?,
    ))
}

/// Parse `H:MM`; trailing characters (seconds, zone) are ignored
fn parse_time(s: &str) -> Option<(u32, u32)> {
    let caps = time_pattern()?.captures(s)?;
    Some((
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
    ))
}

/// Parse a `D/M/Y H:MM` string, degrading as described in the module docs
pub fn parse_timestamp(raw: &str) -> Timestamp {
    let Some((date_part, time_part)) = raw.trim_start().split_once(' ') else {
        return Timestamp::SENTINEL;
    };

    let Some((day, month, year)) = parse_date(date_part) else {
        return Timestamp::SENTINEL;
    };

    match parse_time(time_part) {
        Some((hour, minute)) => Timestamp::new(day, month, year, hour, minute),
        None => Timestamp::date(day, month, year),
    }
}

/// Parse a measurement, mapping the missing token to 0.0
pub fn parse_measurement(raw: &str, column: usize, missing_token: &str) -> Result<f64, RowError> {
    let raw = raw.trim();
    if raw == missing_token {
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(|_| RowError::InvalidNumber {
        column,
        value: raw.to_string(),
    })
}

/// Build an observation from one source row
pub fn parse_row(record: &StringRecord, layout: &SourceLayout) -> Result<Observation, RowError> {
    let required = layout.required_fields();
    if record.len() < required {
        return Err(RowError::TooFewFields {
            found: record.len(),
            required,
        });
    }

    let field = |column: usize| record.get(column).unwrap_or_default();
    let measurement =
        |column: usize| parse_measurement(field(column), column, &layout.missing_token);

    Ok(Observation::new(
        parse_timestamp(field(layout.timestamp_column)),
        measurement(layout.wind_speed_column)?,
        measurement(layout.temperature_column)?,
        measurement(layout.solar_radiation_column)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(datetime: &str, wind: &str, solar: &str, temp: &str) -> StringRecord {
        let mut fields = vec!["0"; 18];
        fields[0] = datetime;
        fields[10] = wind;
        fields[11] = solar;
        fields[17] = temp;
        StringRecord::from(fields)
    }

    #[test]
    fn test_parse_full_timestamp() {
        assert_eq!(parse_timestamp("1/01/2010 9:00"), Timestamp::new(1, 1, 2010, 9, 0));
        assert_eq!(parse_timestamp("31/12/2015 23:50"), Timestamp::new(31, 12, 2015, 23, 50));
        // Seconds are ignored
        assert_eq!(parse_timestamp("5/3/2012 14:20:59"), Timestamp::new(5, 3, 2012, 14, 20));
    }

    #[test]
    fn test_missing_separator_gives_sentinel() {
        assert_eq!(parse_timestamp("1/01/2010"), Timestamp::SENTINEL);
        assert_eq!(parse_timestamp("1/01/2010T9:00"), Timestamp::SENTINEL);
        assert_eq!(parse_timestamp(""), Timestamp::SENTINEL);
    }

    #[test]
    fn test_bad_date_gives_sentinel() {
        assert_eq!(parse_timestamp("2010-01-01 9:00"), Timestamp::SENTINEL);
        assert_eq!(parse_timestamp("x/1/2010 9:00"), Timestamp::SENTINEL);
        assert_eq!(parse_timestamp("1/1 9:00"), Timestamp::SENTINEL);
    }

    #[test]
    fn test_bad_time_keeps_date() {
        assert_eq!(parse_timestamp("1/01/2010 noon"), Timestamp::date(1, 1, 2010));
        assert_eq!(parse_timestamp("1/01/2010 9.00"), Timestamp::date(1, 1, 2010));
        assert_eq!(parse_timestamp("1/01/2010 "), Timestamp::date(1, 1, 2010));
    }

    #[test]
    fn test_out_of_range_fields_pass_through() {
        assert_eq!(parse_timestamp("32/13/2010 25:61"), Timestamp::new(32, 13, 2010, 25, 61));
    }

    #[test]
    fn test_parse_measurement() {
        assert_eq!(parse_measurement("5.5", 10, "N/A").unwrap(), 5.5);
        assert_eq!(parse_measurement(" 12 ", 10, "N/A").unwrap(), 12.0);
        assert_eq!(parse_measurement("N/A", 10, "N/A").unwrap(), 0.0);
        assert_eq!(parse_measurement("-", 10, "-").unwrap(), 0.0);
        assert_eq!(
            parse_measurement("calm", 10, "N/A"),
            Err(RowError::InvalidNumber {
                column: 10,
                value: "calm".to_string()
            })
        );
    }

    #[test]
    fn test_parse_row() {
        let record = row("1/01/2010 9:00", "5", "480.5", "21.3");
        let obs = parse_row(&record, &SourceLayout::default()).unwrap();

        assert_eq!(obs.timestamp, Timestamp::new(1, 1, 2010, 9, 0));
        assert_eq!(obs.wind_speed, 5.0);
        assert_eq!(obs.solar_radiation, 480.5);
        assert_eq!(obs.temperature, 21.3);
    }

    #[test]
    fn test_parse_row_missing_values() {
        let record = row("1/01/2010 9:00", "N/A", "N/A", "N/A");
        let obs = parse_row(&record, &SourceLayout::default()).unwrap();
        assert_eq!(obs.wind_speed, 0.0);
        assert_eq!(obs.solar_radiation, 0.0);
        assert_eq!(obs.temperature, 0.0);
    }

    #[test]
    fn test_short_row_is_rejected() {
        let record = StringRecord::from(vec!["1/01/2010 9:00", "5", "480"]);
        assert_eq!(
            parse_row(&record, &SourceLayout::default()),
            Err(RowError::TooFewFields {
                found: 3,
                required: 18
            })
        );
    }

    #[test]
    fn test_non_numeric_value_rejects_row() {
        let record = row("1/01/2010 9:00", "5", "bright", "21.3");
        assert!(matches!(
            parse_row(&record, &SourceLayout::default()),
            Err(RowError::InvalidNumber { column: 11, .. })
        ));
    }

    #[test]
    fn test_custom_layout() {
        let layout = SourceLayout {
            timestamp_column: 0,
            wind_speed_column: 1,
            solar_radiation_column: 2,
            temperature_column: 3,
            min_fields: 4,
            missing_token: "-".to_string(),
        };
        let record = StringRecord::from(vec!["2/2/2020 10:30", "3.5", "-", "18"]);
        let obs = parse_row(&record, &layout).unwrap();

        assert_eq!(obs.timestamp, Timestamp::new(2, 2, 2020, 10, 30));
        assert_eq!(obs.wind_speed, 3.5);
        assert_eq!(obs.solar_radiation, 0.0);
        assert_eq!(obs.temperature, 18.0);
    }

    #[test]
    fn test_required_fields_covers_columns() {
        let layout = SourceLayout {
            temperature_column: 25,
            ..SourceLayout::default()
        };
        assert_eq!(layout.required_fields(), 26);
        assert_eq!(SourceLayout::default().required_fields(), 18);
    }
}
