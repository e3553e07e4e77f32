//! append-only merkle accumulator for note commitments
//!
//! a binary tree of fixed depth over 32-byte leaves. leaves are appended
//! left to right and never removed; every insertion produces a new root
//! which is remembered in a bounded history so that spends proven against
//! a slightly older root (an "anchor") still verify.
//!
//! ```text
//!                 root (height D)
//!               /                 \
//!          n(D-1,0)             n(D-1,1)
//!           ...                   ...
//!   leaf 0  leaf 1  leaf 2  ...  Z  Z  Z      (Z = zero leaf)
//! ```
//!
//! node hash is `sha256(left || right)`. empty subtrees are memoized per
//! height, the output is identical to hashing the fully padded tree.

mod error;
mod history;
mod path;
mod tree;

pub use error::{MerkleError, Result};
pub use history::RootHistory;
pub use path::MerklePath;
pub use tree::{Accumulator, Snapshot};

use core::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Hash = [u8; 32];

/// value of an unoccupied leaf
pub const ZERO_LEAF: Hash = [0u8; 32];

/// deepest tree we accept (2^32 leaves)
pub const MAX_DEPTH: usize = 32;

/// fixed layout of a hashed node pair: `left(32) || right(32)`
pub fn node_preimage(left: &Hash, right: &Hash) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    buf
}

pub fn hash_siblings(left: &Hash, right: &Hash) -> Hash {
    Sha256::digest(node_preimage(left, right)).into()
}

/// roots of empty subtrees, indexed by height (0 = leaf)
pub fn empty_roots(depth: usize) -> Vec<Hash> {
    let mut roots = Vec::with_capacity(depth + 1);
    roots.push(ZERO_LEAF);
    for h in 0..depth {
        let below = roots[h];
        roots.push(hash_siblings(&below, &below));
    }
    roots
}

/// merkle root of the accumulator (an anchor once superseded)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct MerkleRoot(pub Hash);

impl MerkleRoot {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> Hash {
        self.0
    }
}

impl AsRef<[u8]> for MerkleRoot {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleRoot({})", hex::encode(self.0))
    }
}
