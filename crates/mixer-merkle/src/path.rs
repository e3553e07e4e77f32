//! authentication paths

use serde::{Deserialize, Serialize};

use crate::{hash_siblings, Hash, MerkleRoot};

/// sibling hashes from leaf to root for the leaf at `index`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub index: u64,
    pub siblings: Vec<Hash>,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// fold `leaf` up the path. bit `h` of the index selects whether the
    /// running node is the left (0) or right (1) child at height `h`
    pub fn compute_root(&self, leaf: &Hash) -> MerkleRoot {
        let mut current = *leaf;
        let mut pos = self.index;

        for sibling in &self.siblings {
            current = if pos & 1 == 0 {
                hash_siblings(&current, sibling)
            } else {
                hash_siblings(sibling, &current)
            };
            pos >>= 1;
        }

        MerkleRoot(current)
    }

    pub fn verify(&self, leaf: &Hash, root: &MerkleRoot) -> bool {
        // an index beyond the path's capacity would alias a different leaf
        if self.depth() < 64 && self.index >> self.depth() != 0 {
            return false;
        }
        self.compute_root(leaf) == *root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZERO_LEAF;

    #[test]
    fn test_rejects_index_past_capacity() {
        let path = MerklePath {
            index: 4,
            siblings: vec![ZERO_LEAF, ZERO_LEAF],
        };
        let root = path.compute_root(&ZERO_LEAF);
        assert!(!path.verify(&ZERO_LEAF, &root));
    }
}
