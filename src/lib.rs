//! # weatherstore
//!
//! In-memory store for weather station observations with descriptive
//! statistics over calendar months.
//!
//! ## Features
//!
//! - **Chronological storage**: arena-backed binary search tree keyed by timestamp
//! - **Month lookup**: month index pointing into the tree without owning data
//! - **Ingestion**: manifest-driven CSV loading with shuffled insertion
//! - **Statistics**: mean, sample stdev, mean absolute deviation, Pearson correlation
//! - **Reports**: wind and temperature summaries and a monthly stats file
//!
//! ## Modules
//!
//! - [`storage`]: observation types, ordered store and record collection
//! - [`index`]: month index
//! - [`ingest`]: source parsing and the load pipeline
//! - [`stats`]: statistical functions
//! - [`report`]: summaries built on the collection
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use weatherstore::{report, IngestPipeline, Pairing, RecordCollection};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut collection = RecordCollection::new();
//!     let load = IngestPipeline::new("data")
//!         .with_seed(42)
//!         .load(Path::new("data/met_index.txt"), &mut collection)?;
//!     println!("Loaded {}", load);
//!
//!     println!("{}", report::wind_summary(&collection, 2010, 1)?);
//!
//!     // Year 0 correlates March across every loaded year
//!     let r = report::correlation(&collection, 0, 3, Pairing::SolarTemperature);
//!     println!("S_T: {:.2}", r);
//!
//!     report::write_monthly_stats(&collection, 2010, Path::new("MonthlyStats_2010.txt"))?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod ingest;
pub mod report;
pub mod stats;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    InsertOutcome, Measurement, Observation, ObservationId, OrderedStore, RecordCollection,
    StoreError, StoreResult, Timestamp, Traversal,
};

pub use index::MonthIndex;

pub use ingest::{IngestPipeline, IngestReport, RowError, SourceLayout};

pub use stats::Summary;

pub use report::{
    MonthlyStatsRow, MonthlyTemperature, Pairing, StructureInfo, UnknownPairing, WindSummary,
};

pub use config::{Config, ConfigError, DataConfig, IngestConfig, LoggingConfig};
