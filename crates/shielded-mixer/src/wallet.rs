//! wallet side: finding our notes and building spends
//!
//! the wallet follows the pool's event log. every published ciphertext whose
//! hint matches our encryption key is trial-decrypted; a note is only
//! accepted if it is addressed to our apk and recommits to the commitment
//! inserted at the same index. `NullifierSpent` events retire notes.

use std::collections::{BTreeMap, HashMap};

use rand::{CryptoRng, RngCore};
use tracing::{debug, trace};

use crate::directory::KeyDirectory;
use crate::encryption::{ciphertext_digest, decrypt_note, encrypt_note, CiphertextRecord};
use crate::events::PoolEvent;
use crate::keys::{Account, AddressHint, OwnerPublicKey, ShieldedAddress};
use crate::note::{Note, NoteCommitment, Rho, Trapdoor};
use crate::nullifier::{compute_h_sig, Nullifier};
use crate::pool::{DepositRequest, OutputRecord, PathSource, SpendRequest};
use crate::prover::{ProverRequest, ProverService, SpendInput};
use crate::{MixerError, Result};
use mixer_merkle::MerkleRoot;

/// a note we can spend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedNote {
    /// leaf index in the commitment tree
    pub index: u64,
    pub note: Note,
    pub commitment: NoteCommitment,
    pub nullifier: Nullifier,
}

/// an output of a spend
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipient {
    pub apk: OwnerPublicKey,
    pub value: u64,
}

/// witness plus the public records that go to the pool once proven
#[derive(Clone, Debug)]
pub struct PreparedSpend {
    pub request: ProverRequest,
    pub outputs: Vec<OutputRecord>,
}

impl PreparedSpend {
    pub fn anchor(&self) -> MerkleRoot {
        self.request.anchor
    }

    /// run the prover and assemble the pool request
    pub async fn prove<P: ProverService + ?Sized>(self, prover: &P) -> Result<SpendRequest> {
        let proven = prover.prove(self.request).await?;
        Ok(SpendRequest {
            outputs: self.outputs,
            proof: proven.proof,
            public_inputs: proven.public_inputs,
        })
    }
}

/// build a deposit of `value` into a fresh note for `recipient`
pub fn prepare_deposit<R: RngCore + CryptoRng>(
    recipient: &ShieldedAddress,
    value: u64,
    rng: &mut R,
) -> Result<(DepositRequest, Note)> {
    let note = Note::random(recipient.apk, value, rng);
    let ciphertext = encrypt_note(&note, &recipient.pk_enc, rng)?;
    Ok((
        DepositRequest {
            commitment: note.commit(),
            outer_commitment: note.outer_commitment(),
            ciphertext,
            public_value: value,
        },
        note,
    ))
}

pub struct Wallet {
    account: Account,
    address: ShieldedAddress,
    hint: AddressHint,
    unspent: BTreeMap<u64, OwnedNote>,
    by_nullifier: HashMap<Nullifier, u64>,
    /// events of the pool log already processed by `sync`
    cursor: usize,
}

impl Wallet {
    pub fn new(account: Account) -> Self {
        let address = account.address();
        Self {
            hint: address.pk_enc.hint(),
            address,
            account,
            unspent: BTreeMap::new(),
            by_nullifier: HashMap::new(),
            cursor: 0,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn address(&self) -> ShieldedAddress {
        self.address
    }

    /// process new events of a pool log, returning how many notes were found
    pub fn sync(&mut self, log: &[PoolEvent]) -> usize {
        let start = self.cursor.min(log.len());
        let found = self.scan(&log[start..]).len();
        self.cursor = log.len();
        found
    }

    /// trial-decrypt a batch of events, returning notes newly found
    ///
    /// spent nullifiers in the same batch are applied afterwards, so a note
    /// created and spent inside one batch never shows as unspent.
    pub fn scan(&mut self, events: &[PoolEvent]) -> Vec<OwnedNote> {
        let mut commitments: HashMap<u64, NoteCommitment> = HashMap::new();
        let mut found = Vec::new();

        for event in events {
            match event {
                PoolEvent::CommitmentInserted { index, commitment } => {
                    commitments.insert(*index, *commitment);
                }
                PoolEvent::CiphertextPublished { index, record } => {
                    if record.hint != self.hint {
                        continue;
                    }
                    let Some(expected) = commitments.get(index) else {
                        trace!(index, "ciphertext without commitment in batch");
                        continue;
                    };
                    if let Some(owned) = self.try_accept(*index, expected, record) {
                        found.push(owned);
                    }
                }
                _ => {}
            }
        }

        for owned in &found {
            self.by_nullifier.insert(owned.nullifier, owned.index);
            self.unspent.insert(owned.index, owned.clone());
        }
        self.mark_spent(events);

        if !found.is_empty() {
            debug!(found = found.len(), balance = %self.balance(), "wallet scan");
        }
        found
    }

    fn try_accept(
        &self,
        index: u64,
        expected: &NoteCommitment,
        record: &CiphertextRecord,
    ) -> Option<OwnedNote> {
        let note = match decrypt_note(&record.ciphertext, self.account.encryption_key()) {
            Ok(note) => note,
            Err(e) => {
                trace!(index, error = %e, "hint matched but decryption failed");
                return None;
            }
        };
        if note.apk != self.address.apk {
            trace!(index, "decrypted note addressed to another apk");
            return None;
        }
        let commitment = note.commit();
        if commitment != *expected {
            trace!(index, "decrypted note does not match published commitment");
            return None;
        }
        Some(OwnedNote {
            index,
            nullifier: Nullifier::derive(self.account.spending_key(), &note.rho),
            note,
            commitment,
        })
    }

    /// retire notes whose nullifier was published
    pub fn mark_spent(&mut self, events: &[PoolEvent]) {
        for event in events {
            if let PoolEvent::NullifierSpent { nullifier } = event {
                if let Some(index) = self.by_nullifier.remove(nullifier) {
                    self.unspent.remove(&index);
                }
            }
        }
    }

    pub fn balance(&self) -> u128 {
        self.unspent.values().map(|n| u128::from(n.note.value)).sum()
    }

    pub fn unspent(&self) -> impl Iterator<Item = &OwnedNote> {
        self.unspent.values()
    }

    /// oldest-first selection covering `amount`
    pub fn select_notes(&self, amount: u128) -> Result<Vec<OwnedNote>> {
        let mut total = 0u128;
        let mut selected = Vec::new();
        for owned in self.unspent.values() {
            if total >= amount && !selected.is_empty() {
                break;
            }
            total += u128::from(owned.note.value);
            selected.push(owned.clone());
        }
        if total < amount || selected.is_empty() {
            return Err(MixerError::InsufficientFunds {
                available: total,
                required: amount,
            });
        }
        Ok(selected)
    }

    /// start a spend from this wallet's notes
    pub fn spend(&self) -> SpendBuilder<'_> {
        SpendBuilder::new(&self.account)
    }
}

/// assembles a [`PreparedSpend`]
///
/// any surplus of inputs over outputs becomes a change note to the
/// spender's own address.
pub struct SpendBuilder<'a> {
    account: &'a Account,
    inputs: Vec<OwnedNote>,
    recipients: Vec<Recipient>,
    public_in: u64,
    public_out: u64,
}

impl<'a> SpendBuilder<'a> {
    pub fn new(account: &'a Account) -> Self {
        Self {
            account,
            inputs: Vec::new(),
            recipients: Vec::new(),
            public_in: 0,
            public_out: 0,
        }
    }

    pub fn input(mut self, note: OwnedNote) -> Self {
        self.inputs.push(note);
        self
    }

    pub fn inputs(mut self, notes: impl IntoIterator<Item = OwnedNote>) -> Self {
        self.inputs.extend(notes);
        self
    }

    pub fn output(mut self, apk: OwnerPublicKey, value: u64) -> Self {
        self.recipients.push(Recipient { apk, value });
        self
    }

    pub fn public_in(mut self, value: u64) -> Self {
        self.public_in = value;
        self
    }

    pub fn public_out(mut self, value: u64) -> Self {
        self.public_out = value;
        self
    }

    pub fn build<S, D, R>(self, paths: &S, directory: &D, rng: &mut R) -> Result<PreparedSpend>
    where
        S: PathSource + ?Sized,
        D: KeyDirectory + ?Sized,
        R: RngCore + CryptoRng,
    {
        if self.inputs.is_empty() {
            return Err(MixerError::MalformedRequest("spend needs at least one input"));
        }

        let value_in = self
            .inputs
            .iter()
            .map(|n| u128::from(n.note.value))
            .sum::<u128>()
            + u128::from(self.public_in);
        let value_out = self
            .recipients
            .iter()
            .map(|r| u128::from(r.value))
            .sum::<u128>()
            + u128::from(self.public_out);
        if value_in < value_out {
            return Err(MixerError::InsufficientFunds {
                available: value_in,
                required: value_out,
            });
        }

        let own = self.account.address();
        let mut recipients = self.recipients;
        let change = value_in - value_out;
        if change > 0 {
            let value = u64::try_from(change)
                .map_err(|_| MixerError::MalformedRequest("change exceeds a single note"))?;
            recipients.push(Recipient {
                apk: own.apk,
                value,
            });
        }
        if recipients.len() > usize::from(u8::MAX) + 1 {
            return Err(MixerError::MalformedRequest("too many outputs"));
        }

        // every path must come from the same tree state
        let mut anchor: Option<MerkleRoot> = None;
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for owned in &self.inputs {
            let (path, root) = paths.path(owned.index)?;
            match anchor {
                Some(a) if a != root => {
                    return Err(MixerError::MalformedRequest("input paths taken at different roots"))
                }
                _ => anchor = Some(root),
            }
            inputs.push(SpendInput {
                note: owned.note,
                ask: self.account.spending_key().clone(),
                path,
            });
        }
        let anchor = anchor.ok_or(MixerError::MalformedRequest("spend needs at least one input"))?;

        let nullifiers: Vec<Nullifier> = self.inputs.iter().map(|n| n.nullifier).collect();
        let h_sig = compute_h_sig(&nullifiers);
        let mut phi = [0u8; 32];
        rng.fill_bytes(&mut phi);

        let mut notes = Vec::with_capacity(recipients.len());
        let mut outputs = Vec::with_capacity(recipients.len());
        for (i, recipient) in recipients.iter().enumerate() {
            let address = if recipient.apk == own.apk {
                own
            } else {
                directory.resolve(&recipient.apk)?
            };
            // bounded by the output count check above
            let rho = Rho::derive(&phi, &h_sig, i as u8);
            let note = Note::new(recipient.apk, recipient.value, rho, Trapdoor::random(rng));
            outputs.push(OutputRecord {
                commitment: note.commit(),
                ciphertext: encrypt_note(&note, &address.pk_enc, rng)?,
            });
            notes.push(note);
        }
        let ciphertext_digest = ciphertext_digest(outputs.iter().map(|out| &out.ciphertext));

        debug!(
            inputs = inputs.len(),
            outputs = notes.len(),
            public_in = self.public_in,
            public_out = self.public_out,
            %anchor,
            "spend prepared"
        );

        Ok(PreparedSpend {
            request: ProverRequest {
                anchor,
                inputs,
                outputs: notes,
                phi,
                public_in: self.public_in,
                public_out: self.public_out,
                ciphertext_digest,
            },
            outputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryKeyDirectory;
    use mixer_merkle::Accumulator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn publish(tree: &mut Accumulator, req: &DepositRequest) -> Vec<PoolEvent> {
        let index = tree.insert(req.commitment.0).unwrap();
        vec![
            PoolEvent::CommitmentInserted {
                index,
                commitment: req.commitment,
            },
            PoolEvent::CiphertextPublished {
                index,
                record: req.ciphertext.clone(),
            },
            PoolEvent::RootUpdated {
                root: tree.current_root(),
            },
        ]
    }

    #[test]
    fn test_scan_finds_only_own_notes() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut alice = Wallet::new(Account::random(&mut rng));
        let bob = Account::random(&mut rng).address();
        let mut tree = Accumulator::new(4, 8).unwrap();

        let (to_alice, _) = prepare_deposit(&alice.address(), 30, &mut rng).unwrap();
        let (to_bob, _) = prepare_deposit(&bob, 70, &mut rng).unwrap();

        let mut log = publish(&mut tree, &to_bob);
        log.extend(publish(&mut tree, &to_alice));

        assert_eq!(alice.sync(&log), 1);
        assert_eq!(alice.balance(), 30);
        assert_eq!(alice.unspent().next().map(|n| n.index), Some(1));

        // already processed
        assert_eq!(alice.sync(&log), 0);
    }

    #[test]
    fn test_scan_rejects_commitment_mismatch() {
        let mut rng = StdRng::seed_from_u64(22);
        let mut alice = Wallet::new(Account::random(&mut rng));

        let (mut req, _) = prepare_deposit(&alice.address(), 30, &mut rng).unwrap();
        req.commitment = NoteCommitment([1u8; 32]);

        let mut tree = Accumulator::new(4, 8).unwrap();
        let log = publish(&mut tree, &req);
        assert_eq!(alice.sync(&log), 0);
        assert_eq!(alice.balance(), 0);
    }

    #[test]
    fn test_mark_spent() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut alice = Wallet::new(Account::random(&mut rng));
        let mut tree = Accumulator::new(4, 8).unwrap();

        let (req, _) = prepare_deposit(&alice.address(), 30, &mut rng).unwrap();
        let mut log = publish(&mut tree, &req);
        alice.sync(&log);
        let nf = alice.unspent().next().map(|n| n.nullifier).unwrap();

        log.push(PoolEvent::NullifierSpent { nullifier: nf });
        alice.sync(&log);
        assert_eq!(alice.balance(), 0);
    }

    #[test]
    fn test_select_notes() {
        let mut rng = StdRng::seed_from_u64(24);
        let mut alice = Wallet::new(Account::random(&mut rng));
        let mut tree = Accumulator::new(4, 8).unwrap();

        let mut log = Vec::new();
        for value in [10, 20, 30] {
            let (req, _) = prepare_deposit(&alice.address(), value, &mut rng).unwrap();
            log.extend(publish(&mut tree, &req));
        }
        alice.sync(&log);

        let picked = alice.select_notes(25).unwrap();
        assert_eq!(picked.iter().map(|n| n.note.value).collect::<Vec<_>>(), vec![10, 20]);

        assert!(matches!(
            alice.select_notes(61),
            Err(MixerError::InsufficientFunds { available: 60, required: 61 })
        ));
    }

    #[test]
    fn test_builder_adds_change_and_binds_rho() {
        let mut rng = StdRng::seed_from_u64(25);
        let mut alice = Wallet::new(Account::random(&mut rng));
        let bob = Account::random(&mut rng).address();
        let mut directory = InMemoryKeyDirectory::new();
        directory.register(bob);

        let mut tree = Accumulator::new(4, 8).unwrap();
        let (req, _) = prepare_deposit(&alice.address(), 100, &mut rng).unwrap();
        let log = publish(&mut tree, &req);
        alice.sync(&log);

        let prepared = alice
            .spend()
            .inputs(alice.select_notes(60).unwrap())
            .output(bob.apk, 60)
            .build(&tree, &directory, &mut rng)
            .unwrap();

        let request = &prepared.request;
        assert_eq!(request.anchor, tree.current_root());
        assert_eq!(request.outputs.len(), 2);
        assert_eq!(request.outputs[0].value, 60);
        assert_eq!(request.outputs[1].value, 40);
        assert_eq!(request.outputs[1].apk, alice.address().apk);

        let nfs: Vec<Nullifier> = alice.unspent().map(|n| n.nullifier).collect();
        let h_sig = compute_h_sig(&nfs);
        for (i, note) in request.outputs.iter().enumerate() {
            assert_eq!(note.rho, Rho::derive(&request.phi, &h_sig, i as u8));
            assert_eq!(prepared.outputs[i].commitment, note.commit());
        }
        assert_eq!(
            request.ciphertext_digest,
            ciphertext_digest(prepared.outputs.iter().map(|out| &out.ciphertext))
        );
    }

    #[test]
    fn test_builder_errors() {
        let mut rng = StdRng::seed_from_u64(26);
        let mut alice = Wallet::new(Account::random(&mut rng));
        let stranger = Account::random(&mut rng).address();
        let directory = InMemoryKeyDirectory::new();

        let mut tree = Accumulator::new(4, 8).unwrap();
        let (req, _) = prepare_deposit(&alice.address(), 10, &mut rng).unwrap();
        alice.sync(&publish(&mut tree, &req));
        let notes: Vec<OwnedNote> = alice.unspent().cloned().collect();

        let err = alice.spend().output(stranger.apk, 1).build(&tree, &directory, &mut rng);
        assert!(matches!(err, Err(MixerError::MalformedRequest(_))));

        let err = alice
            .spend()
            .inputs(notes.clone())
            .output(stranger.apk, 11)
            .build(&tree, &directory, &mut rng);
        assert!(matches!(err, Err(MixerError::InsufficientFunds { .. })));

        let err = alice
            .spend()
            .inputs(notes)
            .output(stranger.apk, 10)
            .build(&tree, &directory, &mut rng);
        assert!(matches!(err, Err(MixerError::UnknownRecipient(_))));
    }
}
