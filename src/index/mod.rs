//! Secondary index structures
//!
//! - **MonthIndex**: calendar month → handles into the ordered store
//!
//! # Architecture
//!
//! ```text
//! Query: "every January, any year"
//!        ↓
//! MonthIndex: month 1 → [n7, n2, n40]      (non-owning ids)
//!        ↓
//! OrderedStore: resolve ids → &Observation (sole owner)
//! ```

mod month_index;

pub use month_index::MonthIndex;
