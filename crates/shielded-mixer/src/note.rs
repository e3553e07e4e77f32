//! shielded notes and their commitments
//!
//! a note is `(apk, value, rho, trapdoor)`. the commitment is a
//! three-step sha256 chain over fixed-width operands:
//!
//! ```text
//! inner = sha256(apk(32) || rho(32))
//! outer = sha256(trapdoor(48) || inner(32))
//! cm    = sha256(outer(32) || 0^24 || value_be(8))
//! ```
//!
//! the 24 zero bytes are the only padding anywhere in the scheme.

use core::fmt;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::keys::OwnerPublicKey;
use crate::{MixerError, Result};

pub const APK_BYTES: usize = 32;
pub const RHO_BYTES: usize = 32;
pub const TRAPDOOR_BYTES: usize = 48;
pub const VALUE_BYTES: usize = 8;
/// zero-fill between outer commitment and value
pub const VALUE_PADDING_BYTES: usize = 24;
/// serialized plaintext: `apk || value_be || rho || trapdoor`
pub const NOTE_BYTES: usize = APK_BYTES + VALUE_BYTES + RHO_BYTES + TRAPDOOR_BYTES;

const RHO_DERIVE_TAG: u8 = 0x02;

/// per-note uniqueness seed, later fed to the nullifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rho(pub [u8; RHO_BYTES]);

impl Rho {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; RHO_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(fixed("rho", bytes)?))
    }

    /// output rho bound to the spend: `sha256(0x02 || i || phi || h_sig)`
    ///
    /// ties every output note to the nullifiers of the same transaction, so
    /// two outputs can never share a rho.
    pub fn derive(phi: &[u8; 32], h_sig: &[u8; 32], index: u8) -> Self {
        let mut buf = [0u8; 2 + 32 + 32];
        buf[0] = RHO_DERIVE_TAG;
        buf[1] = index;
        buf[2..34].copy_from_slice(phi);
        buf[34..].copy_from_slice(h_sig);
        Self(Sha256::digest(buf).into())
    }
}

impl fmt::Debug for Rho {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rho({})", hex::encode(self.0))
    }
}

/// commitment trapdoor (blinding)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trapdoor(pub [u8; TRAPDOOR_BYTES]);

impl Trapdoor {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; TRAPDOOR_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self(fixed("trapdoor", bytes)?))
    }
}

impl fmt::Debug for Trapdoor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Trapdoor(..)")
    }
}

// serde only derives arrays up to 32
impl Serialize for Trapdoor {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Trapdoor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Trapdoor::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

/// a shielded note
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// owner public key
    pub apk: OwnerPublicKey,
    /// amount in the smallest unit
    pub value: u64,
    pub rho: Rho,
    pub trapdoor: Trapdoor,
}

impl Note {
    pub fn new(apk: OwnerPublicKey, value: u64, rho: Rho, trapdoor: Trapdoor) -> Self {
        Self { apk, value, rho, trapdoor }
    }

    /// fresh note with random rho and trapdoor (deposits)
    pub fn random<R: RngCore + CryptoRng>(apk: OwnerPublicKey, value: u64, rng: &mut R) -> Self {
        Self::new(apk, value, Rho::random(rng), Trapdoor::random(rng))
    }

    /// build from untrusted byte fields, checking every width
    pub fn from_parts(apk: &[u8], value: u64, rho: &[u8], trapdoor: &[u8]) -> Result<Self> {
        Ok(Self {
            apk: OwnerPublicKey(fixed("apk", apk)?),
            value,
            rho: Rho::from_slice(rho)?,
            trapdoor: Trapdoor::from_slice(trapdoor)?,
        })
    }

    /// plaintext encoding used by the encryption channel
    pub fn to_bytes(&self) -> [u8; NOTE_BYTES] {
        let mut out = [0u8; NOTE_BYTES];
        out[..32].copy_from_slice(&self.apk.0);
        out[32..40].copy_from_slice(&self.value.to_be_bytes());
        out[40..72].copy_from_slice(&self.rho.0);
        out[72..].copy_from_slice(&self.trapdoor.0);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NOTE_BYTES {
            return Err(MixerError::InvalidNoteEncoding {
                field: "note",
                expected: NOTE_BYTES,
                got: bytes.len(),
            });
        }
        let value: [u8; VALUE_BYTES] = fixed("value", &bytes[32..40])?;
        Self::from_parts(&bytes[..32], u64::from_be_bytes(value), &bytes[40..72], &bytes[72..])
    }

    pub fn inner_commitment(&self) -> [u8; 32] {
        Sha256::digest(inner_preimage(&self.apk, &self.rho)).into()
    }

    pub fn outer_commitment(&self) -> [u8; 32] {
        Sha256::digest(outer_preimage(&self.trapdoor, &self.inner_commitment())).into()
    }

    /// the public leaf for this note
    pub fn commit(&self) -> NoteCommitment {
        NoteCommitment::from_outer(&self.outer_commitment(), self.value)
    }
}

/// `apk(32) || rho(32)`
pub fn inner_preimage(apk: &OwnerPublicKey, rho: &Rho) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(&apk.0);
    buf[32..].copy_from_slice(&rho.0);
    buf
}

/// `trapdoor(48) || inner(32)`
pub fn outer_preimage(trapdoor: &Trapdoor, inner: &[u8; 32]) -> [u8; 80] {
    let mut buf = [0u8; 80];
    buf[..TRAPDOOR_BYTES].copy_from_slice(&trapdoor.0);
    buf[TRAPDOOR_BYTES..].copy_from_slice(inner);
    buf
}

/// `outer(32) || 0^24 || value_be(8)`
pub fn commitment_preimage(outer: &[u8; 32], value: u64) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(outer);
    buf[32 + VALUE_PADDING_BYTES..].copy_from_slice(&value.to_be_bytes());
    buf
}

fn fixed<const N: usize>(field: &'static str, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| MixerError::InvalidNoteEncoding {
        field,
        expected: N,
        got: bytes.len(),
    })
}

/// commitment to a note (leaf of the commitment tree)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteCommitment(pub [u8; 32]);

impl NoteCommitment {
    /// finish a commitment from its outer stage. lets the pool check the
    /// value of a deposit without learning the owner or rho
    pub fn from_outer(outer: &[u8; 32], value: u64) -> Self {
        Self(Sha256::digest(commitment_preimage(outer, value)).into())
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for NoteCommitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for NoteCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for NoteCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteCommitment({})", hex::encode(self.0))
    }
}
