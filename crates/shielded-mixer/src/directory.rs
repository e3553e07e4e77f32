//! recipient encryption key lookup
//!
//! notes are addressed by `apk`, but the secrets have to be encrypted to the
//! recipient's x25519 key. the mapping lives outside the pool.

use std::collections::HashMap;

use crate::keys::{OwnerPublicKey, ShieldedAddress};
use crate::{MixerError, Result};

pub trait KeyDirectory {
    /// full address registered for `apk`
    fn resolve(&self, apk: &OwnerPublicKey) -> Result<ShieldedAddress>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyDirectory {
    entries: HashMap<OwnerPublicKey, ShieldedAddress>,
}

impl InMemoryKeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// register or replace the address for its apk
    pub fn register(&mut self, address: ShieldedAddress) {
        self.entries.insert(address.apk, address);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyDirectory for InMemoryKeyDirectory {
    fn resolve(&self, apk: &OwnerPublicKey) -> Result<ShieldedAddress> {
        self.entries
            .get(apk)
            .copied()
            .ok_or_else(|| MixerError::UnknownRecipient(apk.to_string()))
    }
}
