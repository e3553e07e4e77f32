//! prover / verifier boundary
//!
//! the proving system is external and opaque: the pool only sees
//! `(proof, public inputs)` and asks a [`ProofVerifier`] whether the pair is
//! valid. both directions are async and bounded by [`with_timeout`];
//! dropping an in-flight call abandons it without touching pool state.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::keys::SpendingKey;
use crate::note::{Note, NoteCommitment};
use crate::nullifier::Nullifier;
use mixer_merkle::{MerklePath, MerkleRoot};

/// one note being consumed, with everything the circuit needs to open it
#[derive(Clone, Debug)]
pub struct SpendInput {
    pub note: Note,
    pub ask: SpendingKey,
    /// authentication path; carries the leaf index
    pub path: MerklePath,
}

/// witness handed to the prover
#[derive(Clone, Debug)]
pub struct ProverRequest {
    /// root the input paths authenticate against
    pub anchor: MerkleRoot,
    pub inputs: Vec<SpendInput>,
    pub outputs: Vec<Note>,
    /// transaction randomness the output rhos were derived from
    pub phi: [u8; 32],
    /// public value entering the pool
    pub public_in: u64,
    /// public value leaving the pool
    pub public_out: u64,
    /// digest of the ciphertext records published with the outputs
    pub ciphertext_digest: [u8; 32],
}

/// opaque proof bytes
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof(pub Vec<u8>);

impl core::fmt::Debug for Proof {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Proof({} bytes)", self.0.len())
    }
}

/// statement a proof is checked against
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicInputs {
    pub anchor: MerkleRoot,
    pub nullifiers: Vec<Nullifier>,
    pub output_commitments: Vec<NoteCommitment>,
    pub public_in: u64,
    pub public_out: u64,
    pub h_sig: [u8; 32],
    /// binds the published output ciphertexts, see [`crate::ciphertext_digest`]
    pub ciphertext_digest: [u8; 32],
}

/// prover output
#[derive(Clone, Debug)]
pub struct ProvenTransaction {
    pub proof: Proof,
    pub public_inputs: PublicInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProverError {
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("merkle path has {got} siblings, tree depth is {expected}")]
    PathLength { got: usize, expected: usize },

    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("prover timed out after {0:?}")]
    Timeout(Duration),

    #[error("prover unavailable: {0}")]
    Unavailable(String),
}

/// produces proofs for spend witnesses
#[async_trait]
pub trait ProverService: Send + Sync {
    async fn prove(&self, request: ProverRequest) -> Result<ProvenTransaction, ProverError>;
}

/// checks proofs against public inputs
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    /// `Ok(false)` for a well-formed call whose proof does not hold
    async fn verify(&self, proof: &Proof, public_inputs: &PublicInputs)
        -> Result<bool, ProverError>;
}

/// run `fut` with a deadline, mapping expiry to [`ProverError::Timeout`]
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ProverError>
where
    F: Future<Output = Result<T, ProverError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(?limit, "prover call timed out");
            Err(ProverError::Timeout(limit))
        }
    }
}

/// wraps a prover so every call is bounded by a timeout
pub struct TimedProver<P> {
    inner: P,
    limit: Duration,
}

impl<P> TimedProver<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<P: ProverService> ProverService for TimedProver<P> {
    async fn prove(&self, request: ProverRequest) -> Result<ProvenTransaction, ProverError> {
        with_timeout(self.limit, self.inner.prove(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl ProverService for Stalled {
        async fn prove(&self, _request: ProverRequest) -> Result<ProvenTransaction, ProverError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProverError::Unavailable("unreachable".into()))
        }
    }

    fn empty_request() -> ProverRequest {
        ProverRequest {
            anchor: MerkleRoot::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            phi: [0u8; 32],
            public_in: 0,
            public_out: 0,
            ciphertext_digest: [0u8; 32],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_prover_times_out() {
        let prover = TimedProver::new(Stalled, Duration::from_millis(50));
        let err = prover.prove(empty_request()).await.unwrap_err();
        assert_eq!(err, ProverError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok::<_, ProverError>(7u8) }).await;
        assert_eq!(ok, Ok(7));

        let err = with_timeout(Duration::from_secs(1), async {
            Err::<u8, _>(ProverError::Unavailable("down".into()))
        })
        .await;
        assert_eq!(err, Err(ProverError::Unavailable("down".into())));
    }
}
