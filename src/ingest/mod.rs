//! Data Ingestion
//!
//! ```text
//! met_index.txt ──► IngestPipeline ──► parser::parse_row ──► RecordCollection
//!   (file list)      (read, shuffle)     (row → Observation)     (store + index)
//! ```

mod parser;
mod pipeline;

pub use parser::{parse_measurement, parse_row, parse_timestamp, RowError, SourceLayout, MISSING_TOKEN};
pub use pipeline::{IngestPipeline, IngestReport};
