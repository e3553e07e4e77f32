//! key material
//!
//! two independent key pairs per account, as in zerocash:
//! - spending authority `(ask, apk)` with `apk = sha256(ask || 0^256)`.
//!   `apk` is embedded in notes, `ask` derives nullifiers
//! - encryption `(k_sk, k_pk)` over x25519, used only to deliver note
//!   secrets to an offline recipient

use core::fmt;
use core::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{MixerError, ADDRESS_HINT_DOMAIN};

/// fixed layout of the apk preimage: `ask(32) || 0^32`
pub fn apk_preimage(ask: &[u8; 32]) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(ask);
    buf
}

/// spending authority secret (`ask`)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SpendingKey([u8; 32]);

impl SpendingKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// owner public key `apk`
    pub fn public_key(&self) -> OwnerPublicKey {
        OwnerPublicKey(Sha256::digest(apk_preimage(&self.0)).into())
    }
}

impl fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

/// owner public key (`apk`) carried in every note
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerPublicKey(pub [u8; 32]);

impl OwnerPublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for OwnerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for OwnerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerPublicKey({})", hex::encode(self.0))
    }
}

/// x25519 secret for decrypting incoming notes
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionSecretKey([u8; 32]);

impl EncryptionSecretKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn public_key(&self) -> EncryptionPublicKey {
        let secret = x25519_dalek::StaticSecret::from(self.0);
        EncryptionPublicKey(*x25519_dalek::PublicKey::from(&secret).as_bytes())
    }
}

impl fmt::Debug for EncryptionSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionSecretKey(..)")
    }
}

/// x25519 public key notes are encrypted to
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionPublicKey(pub [u8; 32]);

impl EncryptionPublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// short public tag so recipients can skip records not meant for them
    pub fn hint(&self) -> AddressHint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ADDRESS_HINT_DOMAIN);
        hasher.update(&self.0);
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        AddressHint(tag)
    }
}

impl fmt::Debug for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionPublicKey({})", hex::encode(self.0))
    }
}

/// recipient hint published next to a ciphertext
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressHint(pub [u8; 8]);

/// public address: who owns the note and where to send its secrets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedAddress {
    pub apk: OwnerPublicKey,
    pub pk_enc: EncryptionPublicKey,
}

/// `<apk hex>:<pk_enc hex>`
impl fmt::Display for ShieldedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.apk.0), hex::encode(self.pk_enc.0))
    }
}

impl FromStr for ShieldedAddress {
    type Err = MixerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (apk_hex, pk_hex) = s
            .split_once(':')
            .ok_or_else(|| MixerError::InvalidAddress("expected <apk>:<pk_enc>".into()))?;
        Ok(Self {
            apk: OwnerPublicKey(decode_key(apk_hex)?),
            pk_enc: EncryptionPublicKey(decode_key(pk_hex)?),
        })
    }
}

fn decode_key(s: &str) -> Result<[u8; 32], MixerError> {
    let bytes = hex::decode(s).map_err(|e| MixerError::InvalidAddress(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| MixerError::InvalidAddress(format!("key is {} bytes, expected 32", b.len())))
}

/// both secret halves of an address
#[derive(Clone, Debug)]
pub struct Account {
    spending: SpendingKey,
    encryption: EncryptionSecretKey,
}

impl Account {
    pub fn new(spending: SpendingKey, encryption: EncryptionSecretKey) -> Self {
        Self { spending, encryption }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            spending: SpendingKey::random(rng),
            encryption: EncryptionSecretKey::random(rng),
        }
    }

    pub fn spending_key(&self) -> &SpendingKey {
        &self.spending
    }

    pub fn encryption_key(&self) -> &EncryptionSecretKey {
        &self.encryption
    }

    pub fn address(&self) -> ShieldedAddress {
        ShieldedAddress {
            apk: self.spending.public_key(),
            pk_enc: self.encryption.public_key(),
        }
    }
}
