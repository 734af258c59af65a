// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory host and fault-injecting provider for tests.

use std::collections::HashSet;

use ledger_store::MemoryLedger;
use parking_lot::Mutex;

use crate::{
    config::VaultConfig,
    context::{CallContext, Invocation},
    provider::{CryptoProvider, ProviderError, ProviderResult, SoftwareProvider},
};

/// Provider operations that [`FaultyProvider`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Random,
    Generate,
    Import,
    Sign,
    Encrypt,
    Delete,
}

/// A [`SoftwareProvider`] that fails selected operations on demand.
#[derive(Default)]
pub struct FaultyProvider {
    inner: SoftwareProvider,
    faults: Mutex<HashSet<Fault>>,
}

impl FaultyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn heal(&self, fault: Fault) {
        self.faults.lock().remove(&fault);
    }

    pub fn heal_all(&self) {
        self.faults.lock().clear();
    }

    /// Whether the provider still holds material for `id`.
    pub fn holds(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    pub fn live_keys(&self) -> usize {
        self.inner.len()
    }

    pub fn inner(&self) -> &SoftwareProvider {
        &self.inner
    }

    fn check(&self, fault: Fault) -> ProviderResult<()> {
        if self.faults.lock().contains(&fault) {
            return Err(ProviderError::Operation(format!("injected {fault:?} fault")));
        }
        Ok(())
    }
}

impl CryptoProvider for FaultyProvider {
    fn random_bytes(&self, len: usize) -> ProviderResult<Vec<u8>> {
        self.check(Fault::Random)?;
        self.inner.random_bytes(len)
    }

    fn generate_asymmetric_key(&self, id: &str) -> ProviderResult<()> {
        self.check(Fault::Generate)?;
        self.inner.generate_asymmetric_key(id)
    }

    fn generate_symmetric_key(&self, id: &str) -> ProviderResult<()> {
        self.check(Fault::Generate)?;
        self.inner.generate_symmetric_key(id)
    }

    fn import_verifying_key(&self, id: &str, public_key: &[u8]) -> ProviderResult<()> {
        self.check(Fault::Import)?;
        self.inner.import_verifying_key(id, public_key)
    }

    fn sign(&self, id: &str, payload: &[u8]) -> ProviderResult<Vec<u8>> {
        self.check(Fault::Sign)?;
        self.inner.sign(id, payload)
    }

    fn verify(&self, id: &str, payload: &[u8], signature: &[u8]) -> ProviderResult<bool> {
        self.inner.verify(id, payload, signature)
    }

    fn symmetric_encrypt(&self, id: &str, plaintext: &[u8]) -> ProviderResult<Vec<u8>> {
        self.check(Fault::Encrypt)?;
        self.inner.symmetric_encrypt(id, plaintext)
    }

    fn symmetric_decrypt(&self, id: &str, ciphertext: &[u8]) -> ProviderResult<Vec<u8>> {
        self.inner.symmetric_decrypt(id, ciphertext)
    }

    fn delete_key(&self, id: &str) -> ProviderResult<()> {
        self.check(Fault::Delete)?;
        self.inner.delete_key(id)
    }
}

/// Ledger, provider and configuration owned together for record-level tests.
pub struct TestHost {
    pub ledger: MemoryLedger,
    pub crypto: FaultyProvider,
    pub config: VaultConfig,
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_config(VaultConfig::new().with_id_entropy_bytes(16))
    }

    pub fn with_config(config: VaultConfig) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            crypto: FaultyProvider::new(),
            config,
        }
    }

    /// Build an invocation that writes straight to the host ledger.
    pub fn invocation(&self, sender: &str) -> Invocation<'_> {
        Invocation::new(
            &self.ledger,
            &self.crypto,
            &self.config,
            CallContext::new(sender),
        )
    }
}
