//! Reports
//!
//! Read-only views over a [`RecordCollection`] built from the descriptive
//! statistics in [`crate::stats`]:
//!
//! ```text
//! RecordCollection ──► year/month query ──► Measurement::values ──► stats
//!                                                                    │
//!     WindSummary / MonthlyTemperature / MonthlyStatsRow ◄───────────┘
//! ```
//!
//! Every summary type implements `Display` with the line format used on the
//! console and in the monthly stats file, and `Serialize` for JSON output.

use crate::stats::{pearson, total, Summary};
use crate::storage::{month_name, Measurement, Observation, RecordCollection, StoreResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Header line of the monthly stats file
pub const MONTHLY_STATS_HEADER: &str =
    "Month,Avg_Wind(StdDev,MAD),Avg_Temp(StdDev,MAD),Total_Solar_Radiation";

fn name(month: u32) -> &'static str {
    month_name(month).unwrap_or("Unknown")
}

/// Copies of one month of `year`; an invalid month yields nothing
fn month_of_year(collection: &RecordCollection, year: i32, month: u32) -> Vec<Observation> {
    collection.get_by_year_month(year, month).unwrap_or_default()
}

// ============================================================================
// Correlation
// ============================================================================

/// A pair of measurements to correlate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pairing {
    /// `S_T`: solar radiation against temperature
    SolarTemperature,
    /// `S_R`: solar radiation against wind speed
    SolarWind,
    /// `T_R`: temperature against wind speed
    TemperatureWind,
}

impl Pairing {
    pub const ALL: [Pairing; 3] = [
        Pairing::SolarTemperature,
        Pairing::SolarWind,
        Pairing::TemperatureWind,
    ];

    /// Short label used on the command line and in output
    pub fn label(self) -> &'static str {
        match self {
            Pairing::SolarTemperature => "S_T",
            Pairing::SolarWind => "S_R",
            Pairing::TemperatureWind => "T_R",
        }
    }

    /// The (x, y) measurements of this pairing
    pub fn measurements(self) -> (Measurement, Measurement) {
        match self {
            Pairing::SolarTemperature => (Measurement::SolarRadiation, Measurement::Temperature),
            Pairing::SolarWind => (Measurement::SolarRadiation, Measurement::WindSpeed),
            Pairing::TemperatureWind => (Measurement::Temperature, Measurement::WindSpeed),
        }
    }

    /// Split observations into the paired x and y series
    pub fn extract(self, observations: &[Observation]) -> (Vec<f64>, Vec<f64>) {
        let (x, y) = self.measurements();
        (x.values(observations), y.values(observations))
    }
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label that names no known pairing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid correlation type: {0} (expected S_T, S_R or T_R)")]
pub struct UnknownPairing(pub String);

impl FromStr for Pairing {
    type Err = UnknownPairing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pairing::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPairing(s.to_string()))
    }
}

/// Pearson coefficient of `pairing` over one month
///
/// `year == 0` selects the month across all years. An invalid month or an
/// empty selection logs a warning and gives 0.0.
pub fn correlation(collection: &RecordCollection, year: i32, month: u32, pairing: Pairing) -> f64 {
    let selection = if year == 0 {
        collection.get_by_month(month)
    } else {
        collection.get_by_year_month(year, month)
    };

    let observations = match selection {
        Ok(observations) => observations,
        Err(e) => {
            tracing::warn!(year, month, error = %e, "Cannot correlate");
            return 0.0;
        }
    };

    if observations.is_empty() {
        tracing::warn!(year, month, "No data available for the requested month/year combination");
        return 0.0;
    }

    let (x, y) = pairing.extract(&observations);
    pearson(&x, &y)
}

/// [`correlation`] with the pairing given by label; unknown labels give 0.0
pub fn correlation_by_label(collection: &RecordCollection, year: i32, month: u32, label: &str) -> f64 {
    match label.parse::<Pairing>() {
        Ok(pairing) => correlation(collection, year, month, pairing),
        Err(e) => {
            tracing::warn!("{}", e);
            0.0
        }
    }
}

// ============================================================================
// Wind and temperature summaries
// ============================================================================

/// Average wind speed of one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindSummary {
    pub year: i32,
    pub month: u32,
    /// `None` when the month holds no observations
    pub summary: Option<Summary>,
}

impl fmt::Display for WindSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: ", self.month, self.year)?;
        match &self.summary {
            Some(s) => write!(f, "Average speed: {:.2} km/h, Sample stdev: {:.2}", s.mean, s.stdev),
            None => write!(f, "No Data"),
        }
    }
}

/// Mean and sample stdev of wind speed for `month` of `year`
pub fn wind_summary(collection: &RecordCollection, year: i32, month: u32) -> StoreResult<WindSummary> {
    let observations = collection.get_by_year_month(year, month)?;
    Ok(WindSummary {
        year,
        month,
        summary: Summary::of(&Measurement::WindSpeed.values(&observations)),
    })
}

/// Temperature of one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTemperature {
    pub month: u32,
    pub summary: Option<Summary>,
}

impl fmt::Display for MonthlyTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.summary {
            Some(s) => write!(
                f,
                "{}: average: {:.2} degrees C, stdev: {:.2}",
                name(self.month),
                s.mean,
                s.stdev
            ),
            None => write!(f, "{}: No Data", name(self.month)),
        }
    }
}

/// Twelve entries, January first
pub fn monthly_temperatures(collection: &RecordCollection, year: i32) -> Vec<MonthlyTemperature> {
    (1..=12)
        .map(|month| {
            let observations = month_of_year(collection, year, month);
            MonthlyTemperature {
                month,
                summary: Summary::of(&Measurement::Temperature.values(&observations)),
            }
        })
        .collect()
}

// ============================================================================
// Monthly stats file
// ============================================================================

/// Figures for a month that has data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyFigures {
    pub wind: Summary,
    pub temperature: Summary,
    /// Summed, not averaged
    pub total_solar: f64,
}

impl MonthlyFigures {
    /// `None` for an empty month
    pub fn of(observations: &[Observation]) -> Option<Self> {
        Some(Self {
            wind: Summary::of(&Measurement::WindSpeed.values(observations))?,
            temperature: Summary::of(&Measurement::Temperature.values(observations))?,
            total_solar: total(&Measurement::SolarRadiation.values(observations)),
        })
    }
}

/// One row of the monthly stats file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyStatsRow {
    pub month: u32,
    pub figures: Option<MonthlyFigures>,
}

impl fmt::Display for MonthlyStatsRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(figures) = &self.figures else {
            // Blank fillers keep the column count of data rows
            return write!(f, "{},No Data,,,", name(self.month));
        };
        let (w, t) = (&figures.wind, &figures.temperature);
        write!(
            f,
            "{},{:.2}({:.2},{:.2}),{:.2}({:.2},{:.2}),{:.2}",
            name(self.month),
            w.mean,
            w.stdev,
            w.mad,
            t.mean,
            t.stdev,
            t.mad,
            figures.total_solar
        )
    }
}

/// Twelve rows, January first
pub fn monthly_stats(collection: &RecordCollection, year: i32) -> Vec<MonthlyStatsRow> {
    (1..=12)
        .map(|month| MonthlyStatsRow {
            month,
            figures: MonthlyFigures::of(&month_of_year(collection, year, month)),
        })
        .collect()
}

/// Full file text: `Year,<year>` line, header, then one line per row
pub fn render_monthly_stats(year: i32, rows: &[MonthlyStatsRow]) -> String {
    let mut out = format!("Year,{}\n{}\n", year, MONTHLY_STATS_HEADER);
    for row in rows {
        out.push_str(&row.to_string());
        out.push('\n');
    }
    out
}

/// Compute the monthly stats of `year` and write them to `path`
///
/// Missing parent directories are created. Returns the rows written.
pub fn write_monthly_stats(
    collection: &RecordCollection,
    year: i32,
    path: &Path,
) -> StoreResult<Vec<MonthlyStatsRow>> {
    let rows = monthly_stats(collection, year);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_monthly_stats(year, &rows))?;

    tracing::info!(
        year,
        months_with_data = rows.iter().filter(|r| r.figures.is_some()).count(),
        "Wrote monthly stats to {:?}",
        path
    );
    Ok(rows)
}

// ============================================================================
// Structure info
// ============================================================================

/// Shape of the loaded collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureInfo {
    pub total_records: usize,
    /// -1 when empty
    pub height: i64,
    /// Indexed observations per populated month
    pub per_month: BTreeMap<u32, usize>,
    /// Ordering invariant holds and the month index mirrors the store
    pub consistent: bool,
}

impl fmt::Display for StructureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Tree height:   {}", self.height)?;
        writeln!(f, "Consistent:    {}", self.consistent)?;
        for (month, count) in &self.per_month {
            writeln!(f, "  {:<10} {}", name(*month), count)?;
        }
        Ok(())
    }
}

pub fn structure_info(collection: &RecordCollection) -> StructureInfo {
    StructureInfo {
        total_records: collection.get_total_records(),
        height: collection.height(),
        per_month: collection.month_counts(),
        consistent: collection.check_consistency(),
    }
}
