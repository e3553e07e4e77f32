//! pool state machine
//!
//! each unit of value sits in a note that is either `Committed` (its
//! commitment is a leaf) or `Spent` (its nullifier is in the set). three
//! transitions move value:
//!
//! - deposit: public value in, one new commitment. no proof
//! - transfer: proof, nullifiers spent, new commitments, nothing released
//! - withdraw: proof, nullifiers spent, optional change, public value out
//!
//! transfer and withdraw run every check before touching state and only
//! then apply effects that cannot fail, so a rejected request leaves the
//! accumulator, nullifier set and custody exactly as they were. the same
//! holds when the caller drops the future while the verifier is running.
//!
//! a deposit carries the outer stage of its commitment, so the pool can
//! recompute the leaf from the value actually attached. a spend's public
//! inputs carry a digest of its output ciphertexts, so the records cannot
//! be replaced after proving.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::encryption::{ciphertext_digest, CiphertextRecord};
use crate::events::{PoolEvent, Receipt};
use crate::note::NoteCommitment;
use crate::nullifier::{Nullifier, NullifierSet};
use crate::prover::{with_timeout, Proof, ProofVerifier, PublicInputs};
use crate::{MixerError, Result};
use mixer_merkle::{Accumulator, MerklePath, MerkleRoot, Snapshot};

/// a note entering the pool from outside
#[derive(Clone, Debug)]
pub struct DepositRequest {
    pub commitment: NoteCommitment,
    /// `sha256(trapdoor || inner)`; with the attached value it reopens `commitment`
    pub outer_commitment: [u8; 32],
    pub ciphertext: CiphertextRecord,
    /// value the depositor claims to attach
    pub public_value: u64,
}

/// a new note created by a spend
#[derive(Clone, Debug)]
pub struct OutputRecord {
    pub commitment: NoteCommitment,
    pub ciphertext: CiphertextRecord,
}

/// a proven transfer or withdrawal
#[derive(Clone, Debug)]
pub struct SpendRequest {
    pub outputs: Vec<OutputRecord>,
    pub proof: Proof,
    pub public_inputs: PublicInputs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteState {
    Committed,
    Spent,
}

/// anything that can hand out authentication paths
pub trait PathSource {
    fn depth(&self) -> usize;
    fn path(&self, index: u64) -> Result<(MerklePath, MerkleRoot)>;
}

impl PathSource for Accumulator {
    fn depth(&self) -> usize {
        Accumulator::depth(self)
    }

    fn path(&self, index: u64) -> Result<(MerklePath, MerkleRoot)> {
        Ok(Accumulator::path(self, index)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpendKind {
    Transfer,
    Withdraw,
}

impl SpendKind {
    fn as_str(self) -> &'static str {
        match self {
            SpendKind::Transfer => "transfer",
            SpendKind::Withdraw => "withdraw",
        }
    }
}

pub struct Pool<V> {
    config: PoolConfig,
    tree: Accumulator,
    nullifiers: NullifierSet,
    /// public value held in custody
    balance: u128,
    verifier: V,
    log: Vec<PoolEvent>,
}

impl<V: ProofVerifier> Pool<V> {
    pub fn new(config: PoolConfig, verifier: V) -> Result<Self> {
        config.validate()?;
        let tree = Accumulator::new(config.tree_depth, config.root_history)?;
        info!(
            depth = config.tree_depth,
            root_history = config.root_history,
            root = %tree.current_root(),
            "pool initialized"
        );
        Ok(Self {
            config,
            tree,
            nullifiers: NullifierSet::new(),
            balance: 0,
            verifier,
            log: Vec::new(),
        })
    }

    /// accept `attached_value` from outside and commit the new note
    pub fn deposit(&mut self, request: DepositRequest, attached_value: u64) -> Result<Receipt> {
        if attached_value != request.public_value {
            warn!(
                declared = request.public_value,
                attached = attached_value,
                "deposit rejected: value mismatch"
            );
            return Err(MixerError::ValueMismatch {
                declared: request.public_value,
                transferred: attached_value,
            });
        }
        let paid_for = NoteCommitment::from_outer(&request.outer_commitment, attached_value);
        if paid_for != request.commitment {
            warn!(
                attached = attached_value,
                commitment = %request.commitment,
                "deposit rejected: commitment does not hold the attached value"
            );
            return Err(MixerError::ValueMismatch {
                declared: request.public_value,
                transferred: attached_value,
            });
        }
        if self.tree.is_full() {
            return Err(MixerError::TreeFull {
                capacity: self.tree.capacity(),
            });
        }

        let index = self.tree.insert(request.commitment.0)?;
        self.balance += u128::from(attached_value);

        let root = self.tree.current_root();
        let events = vec![
            PoolEvent::CommitmentInserted {
                index,
                commitment: request.commitment,
            },
            PoolEvent::CiphertextPublished {
                index,
                record: request.ciphertext,
            },
            PoolEvent::RootUpdated { root },
        ];
        self.log.extend(events.iter().cloned());

        info!(index, value = attached_value, %root, "deposit accepted");
        Ok(Receipt {
            events,
            root,
            released: 0,
            indices: vec![index],
        })
    }

    /// move value between notes without releasing any
    pub async fn transfer(&mut self, request: SpendRequest, attached_value: u64) -> Result<Receipt> {
        if request.public_inputs.public_out != 0 {
            return Err(MixerError::MalformedRequest("transfer cannot release public value"));
        }
        if request.outputs.is_empty() {
            return Err(MixerError::MalformedRequest("transfer needs at least one output"));
        }
        self.spend(SpendKind::Transfer, request, attached_value).await
    }

    /// release `public_out` to the caller, optionally creating change notes
    pub async fn withdraw(&mut self, request: SpendRequest, attached_value: u64) -> Result<Receipt> {
        if request.public_inputs.public_out == 0 {
            return Err(MixerError::MalformedRequest("withdraw must release public value"));
        }
        self.spend(SpendKind::Withdraw, request, attached_value).await
    }

    /// ask the verifier about a proof, bounded by the configured timeout
    pub async fn verify_proof(&self, proof: &Proof, public_inputs: &PublicInputs) -> Result<bool> {
        let limit = self.config.verify_timeout();
        Ok(with_timeout(limit, self.verifier.verify(proof, public_inputs)).await?)
    }

    async fn spend(
        &mut self,
        kind: SpendKind,
        request: SpendRequest,
        attached_value: u64,
    ) -> Result<Receipt> {
        match self.check_spend(&request, attached_value).await {
            Ok(()) => self.apply_spend(kind, request),
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "spend rejected");
                Err(e)
            }
        }
    }

    /// every precondition of a spend. mutates nothing
    async fn check_spend(&self, request: &SpendRequest, attached_value: u64) -> Result<()> {
        let public = &request.public_inputs;

        if public.nullifiers.is_empty() {
            return Err(MixerError::MalformedRequest("spend without nullifiers"));
        }

        let published: Vec<NoteCommitment> =
            request.outputs.iter().map(|out| out.commitment).collect();
        if published != public.output_commitments {
            return Err(MixerError::ProofInvalid(
                "output commitments differ from public inputs".into(),
            ));
        }
        if ciphertext_digest(request.outputs.iter().map(|out| &out.ciphertext))
            != public.ciphertext_digest
        {
            return Err(MixerError::ProofInvalid(
                "output ciphertexts differ from public inputs".into(),
            ));
        }

        if !self.tree.is_known_root(&public.anchor) {
            return Err(MixerError::RootNotFound(public.anchor));
        }

        let mut seen = HashSet::with_capacity(public.nullifiers.len());
        for nf in &public.nullifiers {
            if self.nullifiers.contains(nf) || !seen.insert(*nf) {
                return Err(MixerError::DoubleSpend(*nf));
            }
        }

        if self.tree.remaining() < request.outputs.len() as u64 {
            return Err(MixerError::TreeFull {
                capacity: self.tree.capacity(),
            });
        }

        if public.public_in != attached_value {
            return Err(MixerError::ValueMismatch {
                declared: public.public_in,
                transferred: attached_value,
            });
        }

        let available = self.balance + u128::from(public.public_in);
        if available < u128::from(public.public_out) {
            return Err(MixerError::InsufficientPoolBalance {
                available,
                requested: public.public_out,
            });
        }

        if !self.verify_proof(&request.proof, public).await? {
            return Err(MixerError::ProofInvalid("verifier rejected proof".into()));
        }

        Ok(())
    }

    /// outputs go in before any nullifier is recorded. `check_spend` has
    /// already reserved room for every output, so no insert below fails
    fn apply_spend(&mut self, kind: SpendKind, request: SpendRequest) -> Result<Receipt> {
        let public = request.public_inputs;
        debug_assert!(self.tree.remaining() >= request.outputs.len() as u64);

        let mut inserted = Vec::with_capacity(2 * request.outputs.len());
        let mut indices = Vec::with_capacity(request.outputs.len());
        for output in request.outputs {
            let index = self.tree.insert(output.commitment.0)?;
            indices.push(index);
            inserted.push(PoolEvent::CommitmentInserted {
                index,
                commitment: output.commitment,
            });
            inserted.push(PoolEvent::CiphertextPublished {
                index,
                record: output.ciphertext,
            });
        }

        let mut events = Vec::with_capacity(public.nullifiers.len() + inserted.len() + 1);
        for nf in &public.nullifiers {
            self.nullifiers.insert(*nf);
            events.push(PoolEvent::NullifierSpent { nullifier: *nf });
        }
        events.extend(inserted);

        self.balance = self.balance + u128::from(public.public_in) - u128::from(public.public_out);

        let root = self.tree.current_root();
        events.push(PoolEvent::RootUpdated { root });
        self.log.extend(events.iter().cloned());

        info!(
            kind = kind.as_str(),
            nullifiers = public.nullifiers.len(),
            outputs = indices.len(),
            released = public.public_out,
            %root,
            "spend accepted"
        );

        Ok(Receipt {
            events,
            root,
            released: public.public_out,
            indices,
        })
    }
}

impl<V> Pool<V> {
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn current_root(&self) -> MerkleRoot {
        self.tree.current_root()
    }

    pub fn is_known_root(&self, root: &MerkleRoot) -> bool {
        self.tree.is_known_root(root)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tree.snapshot()
    }

    /// authentication path for a leaf against the current root
    pub fn path(&self, index: u64) -> Result<(MerklePath, MerkleRoot)> {
        debug!(index, "path requested");
        Ok(self.tree.path(index)?)
    }

    pub fn is_spent(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// public value held by the pool
    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn leaf_count(&self) -> u64 {
        self.tree.len()
    }

    pub fn spent_count(&self) -> usize {
        self.nullifiers.len()
    }

    /// `None` if no note was ever committed at `index`
    pub fn note_state(&self, index: u64, nullifier: &Nullifier) -> Option<NoteState> {
        if index >= self.tree.len() {
            return None;
        }
        if self.nullifiers.contains(nullifier) {
            Some(NoteState::Spent)
        } else {
            Some(NoteState::Committed)
        }
    }

    /// every event since genesis
    pub fn events(&self) -> &[PoolEvent] {
        &self.log
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}

impl<V> PathSource for Pool<V> {
    fn depth(&self) -> usize {
        self.tree.depth()
    }

    fn path(&self, index: u64) -> Result<(MerklePath, MerkleRoot)> {
        Pool::path(self, index)
    }
}
