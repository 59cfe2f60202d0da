//! Ingestion Pipeline
//!
//! ```text
//! manifest ──► for each listed file: open ─► skip header ─► parse rows
//!                                    (skip on failure)      (accept | reject)
//!          ──► shuffle accepted rows ──► insert one by one
//! ```
//!
//! Nothing short of an unreadable manifest stops a load: missing source
//! files and bad rows are logged, counted in the [`IngestReport`] and
//! skipped.
//!
//! The shuffle is what keeps the unbalanced tree shallow. Source files are
//! already close to chronological order, and inserting them as-is would
//! build a tree whose height grows linearly with the row count.

use crate::config::Config;
use crate::ingest::parser::{parse_row, RowError, SourceLayout};
use crate::storage::{InsertOutcome, Observation, RecordCollection, StoreError, StoreResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Counters collected during one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Source files opened successfully
    pub files_read: usize,
    /// Source files listed in the manifest that could not be opened
    pub files_skipped: usize,
    /// Rows parsed into observations
    pub rows_accepted: usize,
    /// Rows dropped as malformed
    pub rows_rejected: usize,
    /// Accepted rows whose timestamp was already stored
    pub duplicates: usize,
    /// Observations added to the collection
    pub inserted: usize,
    /// Seed used for the shuffle, if one ran
    pub seed: Option<u64>,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files={} (skipped {}), rows={} (rejected {}), inserted={} (duplicates {})",
            self.files_read,
            self.files_skipped,
            self.rows_accepted,
            self.rows_rejected,
            self.inserted,
            self.duplicates
        )
    }
}

/// Loads delimited weather sources into a [`RecordCollection`]
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    /// Directory relative manifest entries are resolved against
    data_dir: PathBuf,
    layout: SourceLayout,
    delimiter: u8,
    shuffle: bool,
    seed: Option<u64>,
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new("data")
    }
}

impl IngestPipeline {
    /// Create a pipeline with default layout, shuffling on a clock seed
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            layout: SourceLayout::default(),
            delimiter: b',',
            shuffle: true,
            seed: None,
        }
    }

    /// Build a pipeline from loaded configuration
    pub fn from_config(config: &Config) -> StoreResult<Self> {
        let delimiter = u8::try_from(config.ingest.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                StoreError::Config(format!(
                    "delimiter {:?} is not a single ASCII character",
                    config.ingest.delimiter
                ))
            })?;

        Ok(Self {
            data_dir: config.data.data_dir(),
            layout: config.ingest.layout.clone(),
            delimiter,
            shuffle: config.ingest.shuffle,
            seed: config.ingest.shuffle_seed,
        })
    }

    pub fn with_layout(mut self, layout: SourceLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Fix the shuffle seed for a reproducible insertion order
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Resolve a manifest entry against the data directory
    fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Read the manifest: one file name per line, `\r` stripped, blanks skipped
    pub fn read_manifest(&self, manifest: &Path) -> StoreResult<Vec<PathBuf>> {
        let content = std::fs::read_to_string(manifest).map_err(|e| StoreError::Manifest {
            path: manifest.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(content
            .lines()
            .map(|line| line.replace('\r', ""))
            .filter(|line| !line.is_empty())
            .map(|line| self.resolve(&line))
            .collect())
    }

    fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            // Each physical line is one row; a stray quote must not swallow the next lines
            .quoting(false)
            .trim(csv::Trim::All);
        builder
    }

    /// Parse one source file; an unopenable file is logged and yields nothing
    pub fn read_source(&self, path: &Path, report: &mut IngestReport) -> Vec<Observation> {
        match self.reader_builder().from_path(path) {
            Ok(reader) => {
                report.files_read += 1;
                let observations = self.read_records(reader, &path.display().to_string(), report);
                tracing::debug!(
                    file = %path.display(),
                    rows = observations.len(),
                    "Parsed source file"
                );
                observations
            }
            Err(e) => {
                report.files_skipped += 1;
                tracing::warn!(file = %path.display(), error = %e, "Failed to open source file, skipping");
                Vec::new()
            }
        }
    }

    /// Parse delimited text held in memory (header line included)
    pub fn read_str(&self, data: &str, report: &mut IngestReport) -> Vec<Observation> {
        let reader = self.reader_builder().from_reader(data.as_bytes());
        self.read_records(reader, "<memory>", report)
    }

    /// Parse every record, paired with the 1-based source line it started on
    fn parse_records<'a, R: Read + 'a>(
        &'a self,
        reader: csv::Reader<R>,
    ) -> impl Iterator<Item = (u64, Result<Observation, RowError>)> + 'a {
        reader.into_records().map(move |result| match result {
            Ok(record) => {
                let line = record.position().map_or(0, |p| p.line());
                (line, parse_row(&record, &self.layout))
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                (line, Err(RowError::from(e)))
            }
        })
    }

    fn read_records<R: Read>(
        &self,
        reader: csv::Reader<R>,
        source: &str,
        report: &mut IngestReport,
    ) -> Vec<Observation> {
        let mut observations = Vec::new();

        for (line, parsed) in self.parse_records(reader) {
            match parsed {
                Ok(observation) => {
                    report.rows_accepted += 1;
                    observations.push(observation);
                }
                Err(e) => {
                    report.rows_rejected += 1;
                    tracing::warn!(file = %source, line, error = %e, "Skipping malformed row");
                }
            }
        }

        observations
    }

    /// Read every source listed in the manifest into one batch
    pub fn collect(&self, manifest: &Path) -> StoreResult<(Vec<Observation>, IngestReport)> {
        let sources = self.read_manifest(manifest)?;
        let mut report = IngestReport::default();
        let mut batch = Vec::new();

        for source in &sources {
            batch.extend(self.read_source(source, &mut report));
        }

        Ok((batch, report))
    }

    /// Randomly permute the batch; returns the seed used, or `None` when
    /// shuffling is disabled
    pub fn shuffle(&self, batch: &mut [Observation]) -> Option<u64> {
        if !self.shuffle {
            return None;
        }
        let seed = self.seed.unwrap_or_else(clock_seed);
        let mut rng = StdRng::seed_from_u64(seed);
        batch.shuffle(&mut rng);
        Some(seed)
    }

    /// Insert a batch in its current order
    ///
    /// The first observation stored for a timestamp wins; later ones are
    /// counted as duplicates and dropped.
    pub fn insert_batch(
        &self,
        batch: Vec<Observation>,
        collection: &mut RecordCollection,
        report: &mut IngestReport,
    ) {
        for observation in batch {
            match collection.insert(observation) {
                InsertOutcome::Inserted(_) => report.inserted += 1,
                InsertOutcome::AlreadyPresent { rejected, .. } => {
                    report.duplicates += 1;
                    tracing::debug!(timestamp = %rejected.timestamp, "Dropping duplicate observation");
                }
            }
        }
    }

    /// Shuffle and insert an already parsed batch
    pub fn ingest(
        &self,
        mut batch: Vec<Observation>,
        collection: &mut RecordCollection,
        report: &mut IngestReport,
    ) {
        if batch.is_empty() {
            tracing::error!("No valid records were parsed from files");
            return;
        }

        report.seed = self.shuffle(&mut batch);
        tracing::info!(
            records = batch.len(),
            seed = ?report.seed,
            "Parsed records, shuffling before insertion"
        );

        self.insert_batch(batch, collection, report);
    }

    /// Full load: manifest → parse → shuffle → insert
    pub fn load(&self, manifest: &Path, collection: &mut RecordCollection) -> StoreResult<IngestReport> {
        let (batch, mut report) = self.collect(manifest)?;
        self.ingest(batch, collection, &mut report);

        tracing::info!(
            total = collection.get_total_records(),
            height = collection.height(),
            "Data loading complete: {}",
            report
        );
        Ok(report)
    }
}

fn clock_seed() -> u64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Timestamp;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const HEADER: &str = "WAST,DP,Dta,Dts,EV,QFE,QFF,QNH,RF,RH,S,SR,ST1,ST2,ST3,ST4,Sx,T";

    fn line(datetime: &str, wind: &str, solar: &str, temp: &str) -> String {
        let mut fields = vec!["0"; 18];
        fields[0] = datetime;
        fields[10] = wind;
        fields[11] = solar;
        fields[17] = temp;
        fields.join(",")
    }

    fn source(rows: &[String]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    /// Lays out `<tmp>/data/<name>` files plus `<tmp>/data/met_index.txt`
    fn fixture(files: &[(&str, String)], manifest: &str) -> (TempDir, PathBuf, IngestPipeline) {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        for (name, content) in files {
            fs::write(data_dir.join(name), content).unwrap();
        }
        let manifest_path = data_dir.join("met_index.txt");
        fs::write(&manifest_path, manifest).unwrap();

        let pipeline = IngestPipeline::new(&data_dir).with_seed(42);
        (dir, manifest_path, pipeline)
    }

    #[test]
    fn test_read_manifest_strips_carriage_returns() {
        let (_dir, manifest, pipeline) = fixture(&[], "a.csv\r\n\r\nb.csv\r\n c.csv\n");
        let entries = pipeline.read_manifest(&manifest).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // Only carriage returns are removed; other whitespace is part of the name
        assert_eq!(names, vec!["a.csv", "b.csv", " c.csv"]);
        assert!(entries[0].starts_with(manifest.parent().unwrap()));
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let pipeline = IngestPipeline::new("data");
        let mut collection = RecordCollection::new();
        let err = pipeline
            .load(Path::new("/nonexistent/met_index.txt"), &mut collection)
            .unwrap_err();
        assert!(matches!(err, StoreError::Manifest { .. }));
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let rows = vec![line("1/01/2010 9:00", "5", "100", "20")];
        let (_dir, manifest, pipeline) =
            fixture(&[("present.csv", source(&rows))], "absent.csv\npresent.csv\n");

        let mut collection = RecordCollection::new();
        let report = pipeline.load(&manifest, &mut collection).unwrap();

        assert_eq!(report.files_read, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(collection.get_total_records(), 1);
    }

    #[test]
    fn test_malformed_rows_are_rejected() {
        let rows = vec![
            line("1/01/2010 9:00", "5", "100", "20"),
            "1/01/2010 9:10,short,row".to_string(),
            line("1/01/2010 9:20", "windy", "100", "20"),
            line("1/01/2010 9:30", "N/A", "N/A", "N/A"),
        ];
        let pipeline = IngestPipeline::new("data");
        let mut report = IngestReport::default();
        let observations = pipeline.read_str(&source(&rows), &mut report);

        assert_eq!(report.rows_accepted, 2);
        assert_eq!(report.rows_rejected, 2);
        assert_eq!(observations[1].wind_speed, 0.0);
        assert_eq!(observations[1].temperature, 0.0);
    }

    #[test]
    fn test_header_only_source_loads_nothing() {
        let (_dir, manifest, pipeline) = fixture(&[("empty.csv", source(&[]))], "empty.csv\n");
        let mut collection = RecordCollection::new();
        let report = pipeline.load(&manifest, &mut collection).unwrap();

        assert_eq!(report.files_read, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.seed, None);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_duplicates_are_counted() {
        let rows = vec![
            line("1/01/2010 9:00", "5", "100", "20"),
            line("1/01/2010 9:00", "6", "100", "20"),
            line("1/01/2010 9:10", "7", "100", "20"),
        ];
        let (_dir, manifest, pipeline) = fixture(&[("dup.csv", source(&rows))], "dup.csv\n");
        let mut collection = RecordCollection::new();
        let report = pipeline.load(&manifest, &mut collection).unwrap();

        assert_eq!(report.rows_accepted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(collection.get_total_records(), 2);
        assert!(collection.check_consistency());
    }

    #[test]
    fn test_sentinel_rows_are_loaded() {
        let rows = vec![
            line("1/01/2010", "5", "100", "20"),
            line("3/02/2011 late", "6", "100", "20"),
        ];
        let pipeline = IngestPipeline::new("data");
        let mut report = IngestReport::default();
        let observations = pipeline.read_str(&source(&rows), &mut report);

        assert_eq!(observations[0].timestamp, Timestamp::SENTINEL);
        assert_eq!(observations[1].timestamp, Timestamp::date(3, 2, 2011));
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let batch: Vec<Observation> = (0..200u32)
            .map(|i| Observation::new(Timestamp::new(1, 1, 2010, i / 60, i % 60), i as f64, 0.0, 0.0))
            .collect();

        let pipeline = IngestPipeline::new("data").with_seed(7);
        let mut a = batch.clone();
        let mut b = batch.clone();
        assert_eq!(pipeline.shuffle(&mut a), Some(7));
        pipeline.shuffle(&mut b);

        assert_eq!(a, b);
        assert_ne!(a, batch);

        let mut c = batch.clone();
        assert_eq!(pipeline.clone().with_shuffle(false).shuffle(&mut c), None);
        assert_eq!(c, batch);
    }

    #[test]
    fn test_shuffle_keeps_tree_shallow() {
        // One reading every 10 minutes for 30 days, in file order
        let batch: Vec<Observation> = (0..30 * 144u32)
            .map(|i| {
                let ts = Timestamp::new(i / 144 + 1, 1, 2010, (i % 144) / 6, (i % 6) * 10);
                Observation::new(ts, 0.0, 0.0, 0.0)
            })
            .collect();
        let n = batch.len();

        let mut sorted = RecordCollection::new();
        let mut report = IngestReport::default();
        IngestPipeline::new("data")
            .with_shuffle(false)
            .ingest(batch.clone(), &mut sorted, &mut report);
        assert_eq!(sorted.height(), n as i64 - 1);

        let mut shuffled = RecordCollection::new();
        let mut report = IngestReport::default();
        IngestPipeline::new("data")
            .with_seed(2010)
            .ingest(batch, &mut shuffled, &mut report);

        assert_eq!(shuffled.get_total_records(), n);
        // Random BSTs stay within a small multiple of log2(n)
        assert!(shuffled.height() < 60, "height {}", shuffled.height());
        assert!(shuffled.check_consistency());
    }

    #[test]
    fn test_multiple_files_accumulate() {
        let jan = vec![line("1/01/2010 9:00", "5", "100", "20")];
        let feb = vec![
            line("1/02/2010 9:00", "6", "100", "20"),
            line("2/02/2010 9:00", "7", "100", "20"),
        ];
        let (_dir, manifest, pipeline) = fixture(
            &[("jan.csv", source(&jan)), ("feb.csv", source(&feb))],
            "jan.csv\nfeb.csv\n",
        );

        let mut collection = RecordCollection::new();
        let report = pipeline.load(&manifest, &mut collection).unwrap();
        assert_eq!(report.files_read, 2);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.seed, Some(42));
        assert_eq!(collection.index().count(2), 2);

        // A second load of the same files only finds duplicates
        let again = pipeline.load(&manifest, &mut collection).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 3);
        assert_eq!(collection.get_total_records(), 3);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.ingest.delimiter = ';';
        config.ingest.shuffle_seed = Some(9);
        let pipeline = IngestPipeline::from_config(&config).unwrap();

        let rows = vec![line("1/01/2010 9:00", "5", "100", "20").replace(',', ";")];
        let mut report = IngestReport::default();
        let observations = pipeline.read_str(&source(&rows).replace(',', ";"), &mut report);
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].wind_speed, 5.0);

        config.ingest.delimiter = 'é';
        assert!(matches!(
            IngestPipeline::from_config(&config),
            Err(StoreError::Config(_))
        ));
    }

    /// `line` with one more column overwritten
    fn line_with(datetime: &str, column: usize, value: &str) -> String {
        let base = line(datetime, "5", "100", "20");
        let mut fields: Vec<&str> = base.split(',').collect();
        fields[column] = value;
        fields.join(",")
    }

    #[test]
    fn test_stray_quote_costs_at_most_one_row() {
        let rows = vec![
            line_with("1/01/2010 9:00", 1, "\"note"),
            line("1/01/2010 9:10", "6", "100", "20"),
            line_with("1/01/2010 9:20", 10, "\"7"),
            line("1/01/2010 9:30", "8", "100", "20"),
            line("1/01/2010 9:40", "9", "100", "20"),
        ];
        let pipeline = IngestPipeline::new("data");
        let mut report = IngestReport::default();
        let observations = pipeline.read_str(&source(&rows), &mut report);

        // A quote in an unread column is harmless; one in a measurement rejects only its row
        assert_eq!(report.rows_accepted, 4);
        assert_eq!(report.rows_rejected, 1);
        let winds: Vec<f64> = observations.iter().map(|o| o.wind_speed).collect();
        assert_eq!(winds, vec![5.0, 6.0, 8.0, 9.0]);
    }

    #[test]
    fn test_rows_carry_source_line_numbers() {
        let data = format!(
            "{}\n{}\n\n\n{}\n{}\n",
            HEADER,
            line("1/01/2010 9:00", "5", "100", "20"),
            line("1/01/2010 9:10", "windy", "100", "20"),
            "1/01/2010 9:20,short",
        );
        let pipeline = IngestPipeline::new("data");
        let reader = pipeline.reader_builder().from_reader(data.as_bytes());

        let parsed: Vec<(u64, bool)> = pipeline
            .parse_records(reader)
            .map(|(line, result)| (line, result.is_ok()))
            .collect();

        // Blank lines 3 and 4 are skipped but still counted
        assert_eq!(parsed, vec![(2, true), (5, false), (6, false)]);
    }

    #[test]
    fn test_layout_and_delimiter_builders() {
        let layout = SourceLayout {
            timestamp_column: 0,
            wind_speed_column: 1,
            solar_radiation_column: 2,
            temperature_column: 3,
            min_fields: 4,
            missing_token: "-".to_string(),
        };
        let pipeline = IngestPipeline::new("data")
            .with_layout(layout)
            .with_delimiter(b'\t');

        let data = "when\twind\tsolar\ttemp\n2/2/2020 10:30\t3.5\t-\t18\n";
        let mut report = IngestReport::default();
        let observations = pipeline.read_str(data, &mut report);

        assert_eq!(report.rows_accepted, 1);
        assert_eq!(observations[0].timestamp, Timestamp::new(2, 2, 2020, 10, 30));
        assert_eq!(observations[0].wind_speed, 3.5);
        assert_eq!(observations[0].solar_radiation, 0.0);
        assert_eq!(observations[0].temperature, 18.0);
    }
}
