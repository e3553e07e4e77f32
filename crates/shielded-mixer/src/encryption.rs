//! note encryption to a recipient using x25519 + chacha20poly1305
//!
//! the only way an offline recipient learns the secrets of a note paid to
//! them. wire form:
//!
//! ```text
//! epk(32) || nonce(12) || chacha20poly1305(note(120)) + tag(16)
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::keys::{AddressHint, EncryptionPublicKey, EncryptionSecretKey};
use crate::note::{Note, NOTE_BYTES};
use crate::{CIPHERTEXT_DIGEST_DOMAIN, NOTE_ENCRYPTION_DOMAIN};

const EPK_BYTES: usize = 32;
const NONCE_BYTES: usize = 12;
const TAG_BYTES: usize = 16;
/// total ciphertext length for one note
pub const CIPHERTEXT_BYTES: usize = EPK_BYTES + NONCE_BYTES + NOTE_BYTES + TAG_BYTES;

/// opaque encrypted note
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteCiphertext(pub Vec<u8>);

impl NoteCiphertext {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Debug for NoteCiphertext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NoteCiphertext({} bytes)", self.0.len())
    }
}

/// ciphertext as published by the pool, with the recipient hint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextRecord {
    pub hint: AddressHint,
    pub ciphertext: NoteCiphertext,
}

/// encrypt a note for the holder of `recipient`
pub fn encrypt_note<R: RngCore + CryptoRng>(
    note: &Note,
    recipient: &EncryptionPublicKey,
    rng: &mut R,
) -> Result<CiphertextRecord, EncryptionError> {
    // generate ephemeral keypair
    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut *rng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let recipient_pk = PublicKey::from(recipient.0);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_pk);

    let key = derive_encryption_key(
        shared_secret.as_bytes(),
        ephemeral_public.as_bytes(),
        &recipient.0,
    );

    let mut nonce = [0u8; NONCE_BYTES];
    rng.fill_bytes(&mut nonce);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EncryptionError::InvalidKey)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), note.to_bytes().as_slice())
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(CIPHERTEXT_BYTES);
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);

    Ok(CiphertextRecord {
        hint: recipient.hint(),
        ciphertext: NoteCiphertext(out),
    })
}

/// decrypt a note (recipient side)
///
/// wrong key, tampering and bad lengths all surface as errors local to the
/// caller; nothing about them is published.
pub fn decrypt_note(
    ciphertext: &NoteCiphertext,
    secret: &EncryptionSecretKey,
) -> Result<Note, EncryptionError> {
    let bytes = ciphertext.as_bytes();
    if bytes.len() != CIPHERTEXT_BYTES {
        return Err(EncryptionError::Malformed { len: bytes.len() });
    }
    let (epk, rest) = bytes.split_at(EPK_BYTES);
    let (nonce, sealed) = rest.split_at(NONCE_BYTES);

    let mut epk_bytes = [0u8; EPK_BYTES];
    epk_bytes.copy_from_slice(epk);

    let static_secret = StaticSecret::from(*secret.as_bytes());
    let shared_secret = static_secret.diffie_hellman(&PublicKey::from(epk_bytes));
    let recipient = secret.public_key();

    let key = derive_encryption_key(shared_secret.as_bytes(), &epk_bytes, &recipient.0);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EncryptionError::InvalidKey)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    Note::from_bytes(&plaintext).map_err(|_| EncryptionError::Malformed { len: plaintext.len() })
}

/// digest over the ciphertext records of a spend, in output order
///
/// a public input of the spend statement, so records cannot be swapped
/// after proving without invalidating the proof
pub fn ciphertext_digest<'a, I>(records: I) -> [u8; 32]
where
    I: IntoIterator<Item = &'a CiphertextRecord>,
{
    let mut hasher = blake3::Hasher::new();
    hasher.update(CIPHERTEXT_DIGEST_DOMAIN);
    for record in records {
        hasher.update(&record.hint.0);
        hasher.update(&(record.ciphertext.len() as u64).to_le_bytes());
        hasher.update(record.ciphertext.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// derive symmetric key from shared secret, ephemeral and recipient pubkeys
fn derive_encryption_key(shared_secret: &[u8], epk: &[u8], recipient: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(NOTE_ENCRYPTION_DOMAIN);
    hasher.update(shared_secret);
    hasher.update(epk);
    hasher.update(recipient);
    *hasher.finalize().as_bytes()
}

/// encryption errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    #[error("invalid encryption key")]
    InvalidKey,
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed - invalid ciphertext or wrong key")]
    DecryptionFailed,
    #[error("malformed ciphertext ({len} bytes)")]
    Malformed { len: usize },
}
