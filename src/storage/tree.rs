//! Ordered Store - arena-backed binary search tree of observations
//!
//! Observations live in a dense `Vec` arena and are linked into an unbalanced
//! BST keyed by [`Timestamp`]. Child links and every external reference
//! (the month index, query handles) are [`ObservationId`]s into the arena.
//!
//! # Layout
//! ```text
//! nodes: [ n0 | n1 | n2 | n3 | ... ]      root = n0
//!          |  \
//!         n2   n1                          left/right = Option<ObservationId>
//! ```
//!
//! Nothing is ever removed, so an id stays valid for the lifetime of the store.
//! The tree never rebalances; callers that insert near-sorted data should
//! shuffle first (see the ingestion pipeline).

use crate::storage::types::{Observation, Timestamp};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Handle to an observation owned by an [`OrderedStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationId(usize);

impl ObservationId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Result of [`OrderedStore::insert`]
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// A new node was linked into the tree
    Inserted(ObservationId),
    /// A node with the same timestamp already exists; the tree is unchanged
    /// and the rejected observation is handed back to the caller
    AlreadyPresent {
        existing: ObservationId,
        rejected: Observation,
    },
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }

    /// Id of the node now holding the key
    pub fn id(&self) -> ObservationId {
        match self {
            InsertOutcome::Inserted(id) => *id,
            InsertOutcome::AlreadyPresent { existing, .. } => *existing,
        }
    }
}

/// Traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Left, node, right: ascending chronological order
    InOrder,
    /// Node, left, right
    PreOrder,
    /// Left, right, node
    PostOrder,
}

#[derive(Debug, Clone)]
struct Node {
    observation: Observation,
    left: Option<ObservationId>,
    right: Option<ObservationId>,
}

/// Binary search tree of observations keyed by timestamp
///
/// Exclusively owns every observation inserted into it. `Clone` is a full
/// deep copy: the clone shares nothing with the original.
#[derive(Debug, Clone, Default)]
pub struct OrderedStore {
    nodes: Vec<Node>,
    root: Option<ObservationId>,
}

impl OrderedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation
    ///
    /// Descends from the root comparing timestamps. If an equal key is met on
    /// the way down the tree is left untouched and the observation is returned
    /// inside [`InsertOutcome::AlreadyPresent`].
    pub fn insert(&mut self, observation: Observation) -> InsertOutcome {
        let Some(mut current) = self.root else {
            let id = self.push(observation);
            self.root = Some(id);
            return InsertOutcome::Inserted(id);
        };

        loop {
            let (ordering, left, right) = {
                let node = &self.nodes[current.0];
                (
                    observation.timestamp.cmp(&node.observation.timestamp),
                    node.left,
                    node.right,
                )
            };

            match ordering {
                Ordering::Equal => {
                    return InsertOutcome::AlreadyPresent {
                        existing: current,
                        rejected: observation,
                    };
                }
                Ordering::Less => match left {
                    Some(next) => current = next,
                    None => {
                        let id = self.push(observation);
                        self.nodes[current.0].left = Some(id);
                        return InsertOutcome::Inserted(id);
                    }
                },
                Ordering::Greater => match right {
                    Some(next) => current = next,
                    None => {
                        let id = self.push(observation);
                        self.nodes[current.0].right = Some(id);
                        return InsertOutcome::Inserted(id);
                    }
                },
            }
        }
    }

    fn push(&mut self, observation: Observation) -> ObservationId {
        let id = ObservationId(self.nodes.len());
        self.nodes.push(Node {
            observation,
            left: None,
            right: None,
        });
        id
    }

    /// Swap the measurements stored under `id`, returning the previous
    /// observation. The key must not change.
    pub(crate) fn replace(&mut self, id: ObservationId, observation: Observation) -> Option<Observation> {
        let node = self.nodes.get_mut(id.0)?;
        debug_assert!(node.observation.same_key(&observation));
        Some(std::mem::replace(&mut node.observation, observation))
    }

    /// Find the node holding `key`
    pub fn search(&self, key: &Timestamp) -> Option<ObservationId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            current = match key.cmp(&node.observation.timestamp) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    /// Find the observation stored under `key`
    pub fn find(&self, key: &Timestamp) -> Option<&Observation> {
        self.search(key).and_then(|id| self.get(id))
    }

    /// Resolve an id handed out by this store
    pub fn get(&self, id: ObservationId) -> Option<&Observation> {
        self.nodes.get(id.0).map(|n| &n.observation)
    }

    pub fn contains(&self, key: &Timestamp) -> bool {
        self.search(key).is_some()
    }

    /// Number of stored observations
    ///
    /// Every arena slot is linked into the tree, so this is the arena length.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of edges on the longest root-to-leaf path; -1 when empty
    pub fn height(&self) -> i64 {
        let Some(root) = self.root else {
            return -1;
        };

        let mut height = -1;
        let mut level = VecDeque::from([root]);
        while !level.is_empty() {
            height += 1;
            for _ in 0..level.len() {
                if let Some(id) = level.pop_front() {
                    let node = &self.nodes[id.0];
                    level.extend(node.left);
                    level.extend(node.right);
                }
            }
        }
        height
    }

    /// Verify the BST ordering invariant and that every arena slot is reachable
    pub fn check_invariant(&self) -> bool {
        let mut visited = 0usize;
        let mut stack: Vec<(ObservationId, Option<Timestamp>, Option<Timestamp>)> =
            self.root.map(|r| (r, None, None)).into_iter().collect();

        while let Some((id, lower, upper)) = stack.pop() {
            let node = &self.nodes[id.0];
            let key = node.observation.timestamp;

            if lower.is_some_and(|lo| key <= lo) || upper.is_some_and(|hi| key >= hi) {
                return false;
            }
            visited += 1;

            if let Some(left) = node.left {
                stack.push((left, lower, Some(key)));
            }
            if let Some(right) = node.right {
                stack.push((right, Some(key), upper));
            }
        }

        visited == self.nodes.len()
    }

    /// Ascending chronological iterator
    pub fn iter(&self) -> Iter<'_> {
        self.iter_order(Traversal::InOrder)
    }

    /// Lazy iterator in the requested order
    pub fn iter_order(&self, order: Traversal) -> Iter<'_> {
        Iter {
            store: self,
            order,
            stack: self.root.map(|r| (r, false)).into_iter().collect(),
        }
    }

    /// Apply `visit` to every observation in the requested order
    pub fn traverse_with<F>(&self, order: Traversal, mut visit: F)
    where
        F: FnMut(&Observation),
    {
        for observation in self.iter_order(order) {
            visit(observation);
        }
    }

    /// In-order traversal threading an accumulator through every visit
    pub fn fold_in_order<A, F>(&self, init: A, f: F) -> A
    where
        F: FnMut(A, &Observation) -> A,
    {
        self.iter().fold(init, f)
    }
}

impl<'a> IntoIterator for &'a OrderedStore {
    type Item = &'a Observation;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Stack-driven tree iterator
///
/// Each stack entry carries an `expanded` flag: `false` means the node's
/// children still have to be scheduled, `true` means the node is due.
pub struct Iter<'a> {
    store: &'a OrderedStore,
    order: Traversal,
    stack: Vec<(ObservationId, bool)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Observation;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store;
        while let Some((id, expanded)) = self.stack.pop() {
            let node = &store.nodes[id.0];
            if expanded {
                return Some(&node.observation);
            }

            // Pushed in reverse of the visiting order
            match self.order {
                Traversal::PreOrder => {
                    self.stack.extend(node.right.map(|r| (r, false)));
                    self.stack.extend(node.left.map(|l| (l, false)));
                    return Some(&node.observation);
                }
                Traversal::InOrder => {
                    self.stack.extend(node.right.map(|r| (r, false)));
                    self.stack.push((id, true));
                    self.stack.extend(node.left.map(|l| (l, false)));
                }
                Traversal::PostOrder => {
                    self.stack.push((id, true));
                    self.stack.extend(node.right.map(|r| (r, false)));
                    self.stack.extend(node.left.map(|l| (l, false)));
                }
            }
        }
        None
    }
}
