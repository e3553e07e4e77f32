//! transparent development backend
//!
//! implements both [`ProverService`] and [`ProofVerifier`] without any
//! zero knowledge: the "proof" is the bincode-encoded witness and
//! verification re-checks every relation the circuit would enforce, in the
//! clear. useful for tests and the simulator, worthless for privacy.
//!
//! relations checked:
//! - every path has exactly `depth` siblings and authenticates the input
//!   commitment at the anchor
//! - `apk = sha256(ask || 0^256)` for every input
//! - every public nullifier is `prf_nf(ask, rho)` of its input
//! - `h_sig` is the hash of the nullifiers
//! - output rhos are `prf_rho(phi, h_sig, i)` and output commitments match
//! - `sum(in) + public_in == sum(out) + public_out`
//! - the ciphertext digest the witness was proven with is the public one

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keys::SpendingKey;
use crate::note::{Note, Rho};
use crate::nullifier::{compute_h_sig, Nullifier};
use crate::prover::{
    Proof, ProofVerifier, ProvenTransaction, ProverError, ProverRequest, ProverService,
    PublicInputs,
};
use mixer_merkle::{MerklePath, MerkleRoot};

#[derive(Serialize, Deserialize)]
struct WitnessInput {
    note: Note,
    ask: [u8; 32],
    path: MerklePath,
}

#[derive(Serialize, Deserialize)]
struct Witness {
    anchor: MerkleRoot,
    inputs: Vec<WitnessInput>,
    outputs: Vec<Note>,
    phi: [u8; 32],
    public_in: u64,
    public_out: u64,
    ciphertext_digest: [u8; 32],
}

/// proves and verifies by revealing the witness
#[derive(Clone, Copy, Debug)]
pub struct TransparentBackend {
    depth: usize,
}

impl TransparentBackend {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn public_inputs(witness: &Witness) -> PublicInputs {
        let nullifiers: Vec<Nullifier> = witness
            .inputs
            .iter()
            .map(|input| Nullifier::from_raw(&input.ask, &input.note.rho))
            .collect();
        PublicInputs {
            anchor: witness.anchor,
            h_sig: compute_h_sig(&nullifiers),
            nullifiers,
            output_commitments: witness.outputs.iter().map(Note::commit).collect(),
            public_in: witness.public_in,
            public_out: witness.public_out,
            ciphertext_digest: witness.ciphertext_digest,
        }
    }

    /// every circuit relation, in order; the first violation wins
    fn check(&self, witness: &Witness, public: &PublicInputs) -> Result<(), ProverError> {
        let violation = |msg: String| Err(ProverError::ConstraintViolation(msg));

        if witness.inputs.is_empty() {
            return violation("no inputs".into());
        }
        if witness.anchor != public.anchor {
            return violation("anchor differs from public input".into());
        }
        if witness.inputs.len() != public.nullifiers.len() {
            return violation("nullifier count differs from inputs".into());
        }
        if witness.outputs.len() != public.output_commitments.len() {
            return violation("commitment count differs from outputs".into());
        }
        if witness.outputs.len() > usize::from(u8::MAX) + 1 {
            return violation("too many outputs".into());
        }
        if witness.public_in != public.public_in || witness.public_out != public.public_out {
            return violation("public values differ".into());
        }
        if witness.ciphertext_digest != public.ciphertext_digest {
            return violation("ciphertext digest differs from public input".into());
        }

        for (i, (input, nf)) in witness.inputs.iter().zip(&public.nullifiers).enumerate() {
            if input.path.depth() != self.depth {
                return Err(ProverError::PathLength {
                    got: input.path.depth(),
                    expected: self.depth,
                });
            }
            let cm = input.note.commit();
            if !input.path.verify(&cm.0, &witness.anchor) {
                return violation(format!("input {i} is not a member at the anchor"));
            }
            if SpendingKey::from_bytes(input.ask).public_key() != input.note.apk {
                return violation(format!("input {i} ask does not open apk"));
            }
            if Nullifier::from_raw(&input.ask, &input.note.rho) != *nf {
                return violation(format!("input {i} nullifier mismatch"));
            }
        }

        let h_sig = compute_h_sig(&public.nullifiers);
        if h_sig != public.h_sig {
            return violation("h_sig mismatch".into());
        }

        for (i, (note, cm)) in witness.outputs.iter().zip(&public.output_commitments).enumerate() {
            // bounded above, fits in u8
            let expected_rho = Rho::derive(&witness.phi, &h_sig, i as u8);
            if note.rho != expected_rho {
                return violation(format!("output {i} rho not bound to h_sig"));
            }
            if note.commit() != *cm {
                return violation(format!("output {i} commitment mismatch"));
            }
        }

        let value_in = witness
            .inputs
            .iter()
            .map(|input| u128::from(input.note.value))
            .sum::<u128>()
            + u128::from(witness.public_in);
        let value_out = witness
            .outputs
            .iter()
            .map(|note| u128::from(note.value))
            .sum::<u128>()
            + u128::from(witness.public_out);
        if value_in != value_out {
            return violation(format!("value not conserved: {value_in} in, {value_out} out"));
        }

        Ok(())
    }
}

#[async_trait]
impl ProverService for TransparentBackend {
    async fn prove(&self, request: ProverRequest) -> Result<ProvenTransaction, ProverError> {
        let witness = Witness {
            anchor: request.anchor,
            inputs: request
                .inputs
                .into_iter()
                .map(|input| WitnessInput {
                    note: input.note,
                    ask: *input.ask.as_bytes(),
                    path: input.path,
                })
                .collect(),
            outputs: request.outputs,
            phi: request.phi,
            public_in: request.public_in,
            public_out: request.public_out,
            ciphertext_digest: request.ciphertext_digest,
        };

        let public_inputs = Self::public_inputs(&witness);
        self.check(&witness, &public_inputs)?;

        let bytes =
            bincode::serialize(&witness).map_err(|e| ProverError::MalformedProof(e.to_string()))?;
        debug!(
            inputs = witness.inputs.len(),
            outputs = witness.outputs.len(),
            "transparent proof built"
        );

        Ok(ProvenTransaction {
            proof: Proof(bytes),
            public_inputs,
        })
    }
}

#[async_trait]
impl ProofVerifier for TransparentBackend {
    async fn verify(&self, proof: &Proof, public_inputs: &PublicInputs) -> Result<bool, ProverError> {
        let witness: Witness = match bincode::deserialize(&proof.0) {
            Ok(w) => w,
            Err(e) => {
                debug!(error = %e, "undecodable transparent proof");
                return Ok(false);
            }
        };

        match self.check(&witness, public_inputs) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!(error = %e, "transparent proof rejected");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Account;
    use crate::note::Trapdoor;
    use crate::prover::SpendInput;
    use mixer_merkle::Accumulator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DEPTH: usize = 4;

    struct Fixture {
        request: ProverRequest,
        backend: TransparentBackend,
    }

    fn fixture(out_value: u64, public_out: u64) -> Fixture {
        let mut rng = StdRng::seed_from_u64(11);
        let owner = Account::random(&mut rng);
        let note = Note::random(owner.address().apk, 100, &mut rng);

        let mut tree = Accumulator::new(DEPTH, 8).unwrap();
        tree.insert([9u8; 32]).unwrap();
        let index = tree.insert(note.commit().0).unwrap();
        let (path, anchor) = tree.path(index).unwrap();

        let nf = Nullifier::derive(owner.spending_key(), &note.rho);
        let h_sig = compute_h_sig(&[nf]);
        let phi = [3u8; 32];
        let output = Note::new(
            owner.address().apk,
            out_value,
            Rho::derive(&phi, &h_sig, 0),
            Trapdoor::random(&mut rng),
        );

        Fixture {
            request: ProverRequest {
                anchor,
                inputs: vec![SpendInput {
                    note,
                    ask: owner.spending_key().clone(),
                    path,
                }],
                outputs: vec![output],
                phi,
                public_in: 0,
                public_out,
                ciphertext_digest: [5u8; 32],
            },
            backend: TransparentBackend::new(DEPTH),
        }
    }

    #[tokio::test]
    async fn test_balanced_spend_verifies() {
        let f = fixture(60, 40);
        let proven = f.backend.prove(f.request).await.unwrap();
        assert!(f.backend.verify(&proven.proof, &proven.public_inputs).await.unwrap());
    }

    #[tokio::test]
    async fn test_unbalanced_spend_refused_by_prover() {
        let f = fixture(60, 41);
        let err = f.backend.prove(f.request).await.unwrap_err();
        assert!(matches!(err, ProverError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn test_tampered_public_out_rejected() {
        let f = fixture(60, 40);
        let proven = f.backend.prove(f.request).await.unwrap();

        let mut public = proven.public_inputs.clone();
        public.public_out = 41;
        assert!(!f.backend.verify(&proven.proof, &public).await.unwrap());

        let mut public = proven.public_inputs.clone();
        public.nullifiers[0] = Nullifier([0u8; 32]);
        assert!(!f.backend.verify(&proven.proof, &public).await.unwrap());
    }

    #[tokio::test]
    async fn test_ciphertext_digest_bound_to_proof() {
        let f = fixture(60, 40);
        let proven = f.backend.prove(f.request).await.unwrap();
        assert_eq!(proven.public_inputs.ciphertext_digest, [5u8; 32]);

        // same proof, ciphertexts swapped after proving
        let mut public = proven.public_inputs.clone();
        public.ciphertext_digest = [6u8; 32];
        assert!(!f.backend.verify(&proven.proof, &public).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_path_length() {
        let f = fixture(100, 0);
        let backend = TransparentBackend::new(DEPTH + 1);
        let err = backend.prove(f.request).await.unwrap_err();
        assert_eq!(err, ProverError::PathLength { got: DEPTH, expected: DEPTH + 1 });
    }

    #[tokio::test]
    async fn test_garbage_proof_is_false() {
        let f = fixture(100, 0);
        let proven = f.backend.prove(f.request).await.unwrap();
        let garbage = Proof(vec![1, 2, 3]);
        assert!(!f.backend.verify(&garbage, &proven.public_inputs).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_anchor_refused() {
        let mut f = fixture(100, 0);
        f.request.anchor = MerkleRoot([7u8; 32]);
        let err = f.backend.prove(f.request).await.unwrap_err();
        assert!(matches!(err, ProverError::ConstraintViolation(_)));
    }
}
