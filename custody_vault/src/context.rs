// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-call context: who is calling and what they are calling against.

use base64::{engine::general_purpose::STANDARD, Engine};
use ledger_store::LedgerStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{config::VaultConfig, provider::CryptoProvider, Result};

/// Identity of the principal on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallContext {
    sender: String,
}

impl CallContext {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }
}

/// Everything an operation needs: ledger, provider, configuration and caller.
///
/// Passed explicitly to every record method instead of living in globals.
pub struct Invocation<'a> {
    ledger: &'a dyn LedgerStore,
    crypto: &'a dyn CryptoProvider,
    config: &'a VaultConfig,
    caller: CallContext,
}

impl<'a> Invocation<'a> {
    pub fn new(
        ledger: &'a dyn LedgerStore,
        crypto: &'a dyn CryptoProvider,
        config: &'a VaultConfig,
        caller: CallContext,
    ) -> Self {
        Self {
            ledger,
            crypto,
            config,
            caller,
        }
    }

    pub fn ledger(&self) -> &'a dyn LedgerStore {
        self.ledger
    }

    pub fn crypto(&self) -> &'a dyn CryptoProvider {
        self.crypto
    }

    pub fn config(&self) -> &'a VaultConfig {
        self.config
    }

    pub fn caller(&self) -> &CallContext {
        &self.caller
    }

    pub fn sender(&self) -> &str {
        self.caller.sender()
    }

    /// Mint a fresh identifier from provider randomness, base64 encoded.
    pub fn fresh_id(&self) -> Result<String> {
        self.random_token(self.config.id_entropy_bytes)
    }

    pub fn random_token(&self, bytes: usize) -> Result<String> {
        let raw = self.crypto.random_bytes(bytes)?;
        Ok(STANDARD.encode(raw))
    }

    pub(crate) fn load_json<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        match self.ledger.lookup(table, key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn store_json<T: Serialize>(&self, table: &str, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.ledger.set(table, key, &raw)?;
        Ok(())
    }

    pub(crate) fn erase(&self, table: &str, key: &str) -> Result<()> {
        self.ledger.unset(table, key)?;
        Ok(())
    }
}
