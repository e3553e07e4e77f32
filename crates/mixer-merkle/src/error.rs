use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    #[error("merkle tree full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("leaf index {index} out of range (tree holds {len} leaves)")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("invalid tree depth {0}, must be within 1..=32")]
    InvalidDepth(usize),

    #[error("root history must retain at least one root")]
    InvalidHistorySize,
}

pub type Result<T> = std::result::Result<T, MerkleError>;
