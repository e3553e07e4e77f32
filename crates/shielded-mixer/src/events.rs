//! ledger events emitted by pool transitions

use serde::{Deserialize, Serialize};

use crate::encryption::CiphertextRecord;
use crate::note::NoteCommitment;
use crate::nullifier::Nullifier;
use mixer_merkle::MerkleRoot;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    /// a leaf was appended at `index`
    CommitmentInserted {
        index: u64,
        commitment: NoteCommitment,
    },
    /// the accumulator root after a transition
    RootUpdated { root: MerkleRoot },
    /// encrypted secrets for the note at `index`
    CiphertextPublished {
        index: u64,
        record: CiphertextRecord,
    },
    NullifierSpent { nullifier: Nullifier },
}

/// outcome of a successful transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// events emitted by this transition, in order
    pub events: Vec<PoolEvent>,
    /// root after the transition
    pub root: MerkleRoot,
    /// public value released to the caller
    pub released: u64,
    /// leaf indices assigned to new commitments
    pub indices: Vec<u64>,
}
