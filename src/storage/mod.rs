//! Weather Record Store
//!
//! This module provides the core storage functionality:
//!
//! - **types**: Core data structures (Timestamp, Observation, Measurement)
//! - **tree**: Arena-backed binary search tree that owns every observation
//! - **collection**: Tree plus month index behind one insertion path
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   Observation → OrderedStore (owns) → MonthIndex (ObservationId)
//!
//! Read Path:
//!   Query → In-order traversal → Filter → Owned copies
//! ```
//!
//! # Example
//!
//! ```rust
//! use weatherstore::storage::{Observation, RecordCollection, Timestamp};
//!
//! let mut records = RecordCollection::new();
//! records.insert(Observation::new(Timestamp::new(1, 1, 2010, 9, 0), 5.0, 21.3, 480.0));
//! records.insert(Observation::new(Timestamp::new(1, 1, 2010, 9, 10), 7.0, 21.9, 510.0));
//!
//! let january = records.get_by_year_month(2010, 1).unwrap();
//! assert_eq!(january.len(), 2);
//! ```

pub mod collection;
pub mod error;
pub mod tree;
pub mod types;

// Re-export commonly used types
pub use collection::RecordCollection;
pub use error::{check_month, StoreError, StoreResult};
pub use tree::{InsertOutcome, Iter, ObservationId, OrderedStore, Traversal};
pub use types::{month_name, Measurement, Observation, Timestamp};
