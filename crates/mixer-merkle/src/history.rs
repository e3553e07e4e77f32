//! bounded history of recent roots
//!
//! a ring of the last `capacity` roots with a counted index for O(1)
//! membership. counts are needed because appending a zero leaf leaves the
//! root unchanged, so the same root can occupy several slots.

use std::collections::{HashMap, VecDeque};

use crate::MerkleRoot;

#[derive(Clone, Debug)]
pub struct RootHistory {
    capacity: usize,
    order: VecDeque<MerkleRoot>,
    counts: HashMap<MerkleRoot, usize>,
}

impl RootHistory {
    /// `capacity` must be non-zero, checked by the accumulator
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            counts: HashMap::with_capacity(capacity),
        }
    }

    /// remember `root`, evicting the oldest entry when full.
    /// returns the evicted root if one dropped out of the history entirely
    pub fn push(&mut self, root: MerkleRoot) -> Option<MerkleRoot> {
        let mut evicted = None;
        if self.order.len() == self.capacity {
            if let Some(old) = self.order.pop_front() {
                if let Some(count) = self.counts.get_mut(&old) {
                    *count -= 1;
                    if *count == 0 {
                        self.counts.remove(&old);
                        evicted = Some(old);
                    }
                }
            }
        }
        self.order.push_back(root);
        *self.counts.entry(root).or_insert(0) += 1;
        evicted
    }

    pub fn contains(&self, root: &MerkleRoot) -> bool {
        self.counts.contains_key(root)
    }

    pub fn latest(&self) -> Option<MerkleRoot> {
        self.order.back().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// retained roots, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MerkleRoot> {
        self.order.iter()
    }
}
