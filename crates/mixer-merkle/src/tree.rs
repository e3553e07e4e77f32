//! incremental fixed-depth tree

use serde::{Deserialize, Serialize};

use crate::{
    empty_roots, hash_siblings, Hash, MerkleError, MerklePath, MerkleRoot, Result, RootHistory,
    MAX_DEPTH,
};

/// (version, root) pair captured when a client requests a path.
/// version is the number of leaves at that moment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub root: MerkleRoot,
}

/// append-only merkle accumulator
///
/// only populated nodes are stored; a missing node at height `h` is the
/// empty subtree root `empty[h]`. insert and path are both O(depth).
#[derive(Clone, Debug)]
pub struct Accumulator {
    depth: usize,
    /// levels[0] = leaves, levels[depth] = root (once non-empty)
    levels: Vec<Vec<Hash>>,
    empty: Vec<Hash>,
    history: RootHistory,
}

impl Accumulator {
    /// empty tree of `depth` levels remembering the last `history_size` roots
    pub fn new(depth: usize, history_size: usize) -> Result<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return Err(MerkleError::InvalidDepth(depth));
        }
        if history_size == 0 {
            return Err(MerkleError::InvalidHistorySize);
        }

        let empty = empty_roots(depth);
        let mut history = RootHistory::new(history_size);
        history.push(MerkleRoot(empty[depth]));

        Ok(Self {
            depth,
            levels: vec![Vec::new(); depth + 1],
            empty,
            history,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// number of occupied leaves
    pub fn len(&self) -> u64 {
        self.levels[0].len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn remaining(&self) -> u64 {
        self.capacity() - self.len()
    }

    /// monotonically increasing state version (= leaf count)
    pub fn version(&self) -> u64 {
        self.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version(),
            root: self.current_root(),
        }
    }

    /// append a leaf, returning its index
    pub fn insert(&mut self, leaf: Hash) -> Result<u64> {
        if self.is_full() {
            return Err(MerkleError::TreeFull {
                capacity: self.capacity(),
            });
        }

        let index = self.len();
        self.levels[0].push(leaf);

        let mut pos = index as usize;
        let mut node = leaf;
        for height in 0..self.depth {
            let sibling = self.node(height, pos ^ 1);
            node = if pos & 1 == 0 {
                hash_siblings(&node, &sibling)
            } else {
                hash_siblings(&sibling, &node)
            };
            pos >>= 1;

            // parents fill left to right, so pos is either the last or the next slot
            let parent_level = &mut self.levels[height + 1];
            if pos < parent_level.len() {
                parent_level[pos] = node;
            } else {
                parent_level.push(node);
            }
        }

        self.history.push(MerkleRoot(node));
        Ok(index)
    }

    pub fn current_root(&self) -> MerkleRoot {
        MerkleRoot(self.node(self.depth, 0))
    }

    /// true for the current root and any root still in the history window
    pub fn is_known_root(&self, root: &MerkleRoot) -> bool {
        self.history.contains(root)
    }

    pub fn history(&self) -> &RootHistory {
        &self.history
    }

    pub fn leaf(&self, index: u64) -> Option<Hash> {
        self.levels[0].get(index as usize).copied()
    }

    /// authentication path for `index` plus the root it is valid against
    pub fn path(&self, index: u64) -> Result<(MerklePath, MerkleRoot)> {
        if index >= self.len() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }

        let pos = index as usize;
        let siblings = (0..self.depth)
            .map(|height| self.node(height, (pos >> height) ^ 1))
            .collect();

        Ok((MerklePath { index, siblings }, self.current_root()))
    }

    fn node(&self, height: usize, pos: usize) -> Hash {
        self.levels[height]
            .get(pos)
            .copied()
            .unwrap_or(self.empty[height])
    }
}
