//! error types for the mixer

use mixer_merkle::{MerkleError, MerkleRoot};
use thiserror::Error;

use crate::encryption::EncryptionError;
use crate::nullifier::Nullifier;
use crate::prover::ProverError;

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("invalid note encoding: {field} must be {expected} bytes, got {got}")]
    InvalidNoteEncoding {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("merkle tree full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("anchor {0} not in root history")]
    RootNotFound(MerkleRoot),

    #[error("nullifier {0} already spent")]
    DoubleSpend(Nullifier),

    #[error("proof rejected: {0}")]
    ProofInvalid(String),

    #[error("value mismatch: declared {declared}, transferred {transferred}")]
    ValueMismatch { declared: u64, transferred: u64 },

    #[error("pool holds {available}, cannot release {requested}")]
    InsufficientPoolBalance { available: u128, requested: u64 },

    #[error("malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: u128, required: u128 },

    #[error("no encryption key registered for recipient {0}")]
    UnknownRecipient(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("merkle error: {0}")]
    Merkle(MerkleError),

    #[error("prover error: {0}")]
    Prover(#[from] ProverError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),
}

impl From<MerkleError> for MixerError {
    fn from(err: MerkleError) -> Self {
        match err {
            MerkleError::TreeFull { capacity } => MixerError::TreeFull { capacity },
            other => MixerError::Merkle(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, MixerError>;
