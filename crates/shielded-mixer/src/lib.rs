//! shielded mixer
//!
//! zerocash-style note / commitment / nullifier protocol over an append-only
//! sha256 commitment tree, plus the deposit / transfer / withdraw state
//! machine that gates value movement on proof verification.
//!
//! # architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         POOL (ledger)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  accumulator      append-only merkle tree of commitments     │
//! │  root history     recent anchors, stale proofs still verify  │
//! │  nullifier set    spent notes, only grows                    │
//! │  custody          public value held by the pool              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  deposit   value in  ─► commitment + ciphertext              │
//! │  transfer  proof ─► nullifiers spent ─► new commitments      │
//! │  withdraw  proof ─► nullifiers spent ─► value out            │
//! └─────────────────────────────────────────────────────────────┘
//!            ▲ events                          │ verify(proof)
//!            │                                 ▼
//! ┌─────────────────────┐            ┌─────────────────────────┐
//! │ wallet              │  request   │ prover / verifier       │
//! │ scan + trial decrypt├───────────►│ (external, opaque)      │
//! │ build spends        │◄───────────┤                         │
//! └─────────────────────┘   proof    └─────────────────────────┘
//! ```
//!
//! all hashes are sha256 over fixed byte layouts; see [`note`] and
//! [`nullifier`] for the exact preimages.

pub mod config;
pub mod directory;
pub mod encryption;
pub mod error;
pub mod events;
pub mod keys;
pub mod note;
pub mod nullifier;
pub mod pool;
pub mod prover;
pub mod transparent;
pub mod wallet;

pub use config::PoolConfig;
pub use directory::{InMemoryKeyDirectory, KeyDirectory};
pub use encryption::{
    ciphertext_digest, decrypt_note, encrypt_note, CiphertextRecord, EncryptionError,
    NoteCiphertext,
};
pub use error::{MixerError, Result};
pub use events::{PoolEvent, Receipt};
pub use keys::{
    Account, AddressHint, EncryptionPublicKey, EncryptionSecretKey, OwnerPublicKey,
    ShieldedAddress, SpendingKey,
};
pub use note::{Note, NoteCommitment, Rho, Trapdoor};
pub use nullifier::{compute_h_sig, Nullifier, NullifierSet};
pub use pool::{DepositRequest, NoteState, OutputRecord, PathSource, Pool, SpendRequest};
pub use prover::{
    with_timeout, Proof, ProofVerifier, ProvenTransaction, ProverError, ProverRequest,
    ProverService, PublicInputs, SpendInput, TimedProver,
};
pub use transparent::TransparentBackend;
pub use wallet::{prepare_deposit, OwnedNote, PreparedSpend, Recipient, SpendBuilder, Wallet};

pub use mixer_merkle::{Accumulator, MerklePath, MerkleRoot};

/// domain separator for ciphertext key derivation
pub const NOTE_ENCRYPTION_DOMAIN: &[u8] = b"shielded-mixer.note-encryption.v1";
/// domain separator for recipient address hints
pub const ADDRESS_HINT_DOMAIN: &[u8] = b"shielded-mixer.address-hint.v1";
/// domain separator for the digest of a spend's output ciphertexts
pub const CIPHERTEXT_DIGEST_DOMAIN: &[u8] = b"shielded-mixer.ciphertext-digest.v1";
