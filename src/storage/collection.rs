//! Record Collection
//!
//! Composes the ordered store and the month index:
//! - Write path: Observation → OrderedStore (owner) → MonthIndex (id only)
//! - Read path: in-order traversal → filter → owned copies
//!
//! Not synchronised. Concurrent callers must wrap the collection in a
//! single-writer lock; the store and index are updated in two steps.

use crate::index::MonthIndex;
use crate::storage::error::{check_month, StoreResult};
use crate::storage::tree::{InsertOutcome, Iter, ObservationId, OrderedStore, Traversal};
use crate::storage::types::{Observation, Timestamp};
use std::collections::BTreeMap;

/// Weather observations stored chronologically and grouped by month
///
/// `Clone` deep-copies both structures; ids in the cloned index resolve
/// against the cloned store.
#[derive(Debug, Clone, Default)]
pub struct RecordCollection {
    store: OrderedStore,
    by_month: MonthIndex,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation
    ///
    /// The month index is only updated when the store links a new node. On
    /// [`InsertOutcome::AlreadyPresent`] the rejected observation comes back
    /// to the caller, who decides whether to drop, count or merge it.
    pub fn insert(&mut self, observation: Observation) -> InsertOutcome {
        let month = observation.month();
        let outcome = self.store.insert(observation);
        if let InsertOutcome::Inserted(id) = outcome {
            self.by_month.register(month, id);
        }
        outcome
    }

    /// Insert, or overwrite the measurements of an existing key
    ///
    /// Returns the replaced observation when the key was already present.
    pub fn upsert(&mut self, observation: Observation) -> Option<Observation> {
        match self.insert(observation) {
            InsertOutcome::Inserted(_) => None,
            // Same timestamp means same month: the index entry stays valid
            InsertOutcome::AlreadyPresent { existing, rejected } => {
                self.store.replace(existing, rejected)
            }
        }
    }

    /// Copies of every observation in `month`, any year, ascending
    pub fn get_by_month(&self, month: u32) -> StoreResult<Vec<Observation>> {
        let month = check_month(month)?;
        Ok(self
            .store
            .iter()
            .filter(|o| o.timestamp.month == month)
            .cloned()
            .collect())
    }

    /// Copies of every observation in `month` of `year`, ascending
    pub fn get_by_year_month(&self, year: i32, month: u32) -> StoreResult<Vec<Observation>> {
        let month = check_month(month)?;
        Ok(self
            .store
            .iter()
            .filter(|o| o.timestamp.year == year && o.timestamp.month == month)
            .cloned()
            .collect())
    }

    /// Borrowed view of `month` through the index, in insertion order
    pub fn month_records(&self, month: u32) -> impl Iterator<Item = &Observation> + '_ {
        self.by_month
            .ids(month)
            .iter()
            .filter_map(move |id| self.store.get(*id))
    }

    pub fn find(&self, key: &Timestamp) -> Option<&Observation> {
        self.store.find(key)
    }

    pub fn get(&self, id: ObservationId) -> Option<&Observation> {
        self.store.get(id)
    }

    pub fn get_total_records(&self) -> usize {
        self.store.size()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn height(&self) -> i64 {
        self.store.height()
    }

    /// Ascending chronological iterator
    pub fn iter(&self) -> Iter<'_> {
        self.store.iter()
    }

    pub fn iter_order(&self, order: Traversal) -> Iter<'_> {
        self.store.iter_order(order)
    }

    /// One formatted line per observation, ascending
    pub fn display_all(&self) -> Vec<String> {
        self.store.iter().map(|o| o.to_string()).collect()
    }

    /// Index counts per populated month
    pub fn month_counts(&self) -> BTreeMap<u32, usize> {
        self.by_month.counts()
    }

    pub fn store(&self) -> &OrderedStore {
        &self.store
    }

    pub fn index(&self) -> &MonthIndex {
        &self.by_month
    }

    /// Verify the store invariant and that the index mirrors the store
    ///
    /// For every month the index count must equal the number of stored
    /// observations in that month, and every indexed id must resolve to an
    /// observation of that month.
    pub fn check_consistency(&self) -> bool {
        if !self.store.check_invariant() || self.by_month.total() != self.store.size() {
            return false;
        }

        let mut stored: BTreeMap<u32, usize> = BTreeMap::new();
        for observation in self.store.iter() {
            *stored.entry(observation.month()).or_default() += 1;
        }

        stored == self.by_month.counts()
            && self.by_month.months().into_iter().all(|month| {
                self.by_month
                    .ids(month)
                    .iter()
                    .all(|id| self.store.get(*id).is_some_and(|o| o.month() == month))
            })
    }
}

impl Extend<Observation> for RecordCollection {
    /// Inserts every observation, dropping duplicate keys
    fn extend<T: IntoIterator<Item = Observation>>(&mut self, iter: T) {
        for observation in iter {
            self.insert(observation);
        }
    }
}

impl FromIterator<Observation> for RecordCollection {
    fn from_iter<T: IntoIterator<Item = Observation>>(iter: T) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}
