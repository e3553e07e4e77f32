//! nullifiers for preventing double-spends
//!
//! `nf = sha256(ask(32) || 0x01 || rho'(32))` where `rho'` keeps the first
//! 254 bits of rho (msb-first) and zeroes the last two. the circuit packs
//! rho into a single field element, so the host side truncates the same way.
//!
//! when a note is spent its nullifier is published. a nullifier already in
//! the set means the note was spent before and the spend is rejected.

use core::fmt;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::keys::SpendingKey;
use crate::note::Rho;

/// discriminates nullifier preimages from every other sha256 input
pub const NULLIFIER_TAG: u8 = 0x01;
/// bits of rho that reach the nullifier
pub const RHO_TRUNCATED_BITS: usize = 254;

/// keep the first `bits` bits of `bytes`, zero the rest
pub fn truncate_bits<const N: usize>(bytes: &[u8; N], bits: usize) -> [u8; N] {
    let mut out = [0u8; N];
    let full = bits / 8;
    out[..full].copy_from_slice(&bytes[..full]);
    let rem = bits % 8;
    if rem != 0 && full < N {
        out[full] = bytes[full] & (0xFFu8 << (8 - rem));
    }
    out
}

/// `ask(32) || tag(1) || truncate(rho, 254)(32)`
pub fn nullifier_preimage(ask: &[u8; 32], rho: &Rho) -> [u8; 65] {
    let mut buf = [0u8; 65];
    buf[..32].copy_from_slice(ask);
    buf[32] = NULLIFIER_TAG;
    buf[33..].copy_from_slice(&truncate_bits(&rho.0, RHO_TRUNCATED_BITS));
    buf
}

/// nullifier - unique public tag of a spent note
///
/// only the holder of `ask` can compute it, and each note has exactly one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// derive nullifier for a note
    pub fn derive(ask: &SpendingKey, rho: &Rho) -> Self {
        Self::from_raw(ask.as_bytes(), rho)
    }

    pub(crate) fn from_raw(ask: &[u8; 32], rho: &Rho) -> Self {
        Self(Sha256::digest(nullifier_preimage(ask, rho)).into())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({})", hex::encode(self.0))
    }
}

/// signature hash binding a transaction's outputs to its inputs
pub fn compute_h_sig(nullifiers: &[Nullifier]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for nf in nullifiers {
        hasher.update(nf.0);
    }
    hasher.finalize().into()
}

/// nullifier set - tracks spent notes. only grows.
#[derive(Clone, Debug, Default)]
pub struct NullifierSet {
    nullifiers: HashSet<Nullifier>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// check if nullifier exists (note already spent)
    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// insert nullifier (mark note as spent)
    /// returns false if already exists (double-spend attempt)
    pub fn insert(&mut self, nullifier: Nullifier) -> bool {
        self.nullifiers.insert(nullifier)
    }

    /// number of spent notes
    pub fn len(&self) -> usize {
        self.nullifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nullifier> {
        self.nullifiers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_nullifier_derivation() {
        let ask = SpendingKey::from_bytes([1u8; 32]);
        let rho = Rho([2u8; 32]);

        let nf = Nullifier::derive(&ask, &rho);

        // same inputs = same nullifier
        assert_eq!(nf, Nullifier::derive(&ask, &rho));

        // different key = different nullifier
        let other = SpendingKey::from_bytes([3u8; 32]);
        assert_ne!(nf, Nullifier::derive(&other, &rho));

        // different rho = different nullifier
        assert_ne!(nf, Nullifier::derive(&ask, &Rho([4u8; 32])));
    }

    #[test]
    fn test_preimage_layout() {
        let mut rho = [0xFFu8; 32];
        rho[0] = 0xAB;
        let preimage = nullifier_preimage(&[7u8; 32], &Rho(rho));

        assert_eq!(&preimage[..32], &[7u8; 32]);
        assert_eq!(preimage[32], NULLIFIER_TAG);
        assert_eq!(preimage[33], 0xAB);
        assert_eq!(&preimage[34..64], &[0xFFu8; 30]);
        // last two bits dropped
        assert_eq!(preimage[64], 0xFC);
    }

    #[test]
    fn test_truncated_bits_do_not_matter() {
        let ask = SpendingKey::from_bytes([1u8; 32]);
        let mut a = [9u8; 32];
        let mut b = a;
        a[31] = 0b1010_1000;
        b[31] = 0b1010_1011;
        assert_eq!(Nullifier::derive(&ask, &Rho(a)), Nullifier::derive(&ask, &Rho(b)));
    }

    #[test]
    fn test_truncate_bits() {
        assert_eq!(truncate_bits(&[0xFFu8; 2], 12), [0xFF, 0xF0]);
        assert_eq!(truncate_bits(&[0xFFu8; 2], 16), [0xFF, 0xFF]);
        assert_eq!(truncate_bits(&[0xFFu8; 2], 0), [0x00, 0x00]);
    }

    #[test]
    fn test_h_sig_is_order_sensitive() {
        let a = Nullifier([1u8; 32]);
        let b = Nullifier([2u8; 32]);
        assert_ne!(compute_h_sig(&[a, b]), compute_h_sig(&[b, a]));

        let mut concat = Vec::new();
        concat.extend_from_slice(&a.0);
        concat.extend_from_slice(&b.0);
        let expected: [u8; 32] = Sha256::digest(&concat).into();
        assert_eq!(compute_h_sig(&[a, b]), expected);
    }

    #[test]
    fn test_nullifier_set() {
        let mut set = NullifierSet::new();
        let nf = Nullifier([1u8; 32]);

        assert!(!set.contains(&nf));
        assert!(set.insert(nf));
        assert!(set.contains(&nf));
        assert!(!set.insert(nf)); // double-spend rejected
        assert_eq!(set.len(), 1);
    }

    proptest! {
        #[test]
        fn distinct_inputs_give_distinct_nullifiers(
            ask_a in any::<[u8; 32]>(),
            ask_b in any::<[u8; 32]>(),
            rho_a in any::<[u8; 32]>(),
            rho_b in any::<[u8; 32]>(),
        ) {
            let ta = truncate_bits(&rho_a, RHO_TRUNCATED_BITS);
            let tb = truncate_bits(&rho_b, RHO_TRUNCATED_BITS);
            prop_assume!(ask_a != ask_b || ta != tb);

            let nf_a = Nullifier::derive(&SpendingKey::from_bytes(ask_a), &Rho(rho_a));
            let nf_b = Nullifier::derive(&SpendingKey::from_bytes(ask_b), &Rho(rho_b));
            prop_assert_ne!(nf_a, nf_b);
        }
    }
}
