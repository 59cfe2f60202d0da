//! Month Index - calendar month → observation handles
//!
//! Groups stored observations by month number irrespective of year.
//! Holds [`ObservationId`]s only; the [`OrderedStore`] remains the sole owner
//! of every observation.
//!
//! # Usage
//! ```ignore
//! // When asked for "every January":
//! let ids = month_index.ids(1);
//! // ids = [n7, n2, n40, ...] - insertion order, resolve through the store
//! ```
//!
//! [`OrderedStore`]: crate::storage::OrderedStore

use crate::storage::ObservationId;
use std::collections::BTreeMap;

/// Non-owning secondary index keyed by month number
///
/// Entries appear in insertion order, not chronological order. Month keys are
/// whatever the stored timestamps carry; out-of-range months get their own
/// bucket rather than being dropped.
#[derive(Debug, Clone, Default)]
pub struct MonthIndex {
    /// month → ids of observations in that month
    index: BTreeMap<u32, Vec<ObservationId>>,
}

impl MonthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` holds an observation taken in `month`
    pub fn register(&mut self, month: u32, id: ObservationId) {
        self.index.entry(month).or_default().push(id);
    }

    /// Ids registered under `month`, in insertion order
    pub fn ids(&self, month: u32) -> &[ObservationId] {
        self.index.get(&month).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of observations registered under `month`
    pub fn count(&self, month: u32) -> usize {
        self.index.get(&month).map(Vec::len).unwrap_or(0)
    }

    /// Months with at least one observation, ascending
    pub fn months(&self) -> Vec<u32> {
        self.index.keys().copied().collect()
    }

    /// Per-month counts for every populated month
    pub fn counts(&self) -> BTreeMap<u32, usize> {
        self.index.iter().map(|(m, ids)| (*m, ids.len())).collect()
    }

    /// Total number of registered ids across all months
    pub fn total(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
