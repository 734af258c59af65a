// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ledger Store: flat `(table, key) -> text` storage for the custody vault.
//!
//! The ledger is the only persistence the vault engine sees. Values are
//! plain text; the empty string is the "absent" sentinel, so reading a key
//! that was never written (or was unset) returns `""` rather than an error.
//!
//! Two implementations ship with the crate:
//! - [`MemoryLedger`]: a process-local ledger guarded by a single lock
//! - [`LedgerTransaction`]: a buffered overlay over any other ledger whose
//!   writes become visible to the base only on [`LedgerTransaction::commit`]

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod error;
mod memory;
mod transaction;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use transaction::LedgerTransaction;

/// A single buffered mutation, applied in bulk by [`LedgerStore::apply_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    Set {
        table: String,
        key: String,
        value: String,
    },
    Unset {
        table: String,
        key: String,
    },
}

impl LedgerWrite {
    pub fn set(table: &str, key: &str, value: &str) -> Self {
        if value.is_empty() {
            return Self::unset(table, key);
        }
        Self::Set {
            table: table.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn unset(table: &str, key: &str) -> Self {
        Self::Unset {
            table: table.to_string(),
            key: key.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::Set { table, .. } | Self::Unset { table, .. } => table,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Unset { key, .. } => key,
        }
    }
}

/// Host-provided key/value ledger.
///
/// Implementations must treat `set(table, key, "")` exactly like
/// `unset(table, key)`: the empty string is never stored.
pub trait LedgerStore: Send + Sync {
    /// Read a value; returns `""` when the key is absent.
    fn get(&self, table: &str, key: &str) -> Result<String>;

    fn set(&self, table: &str, key: &str, value: &str) -> Result<()>;

    fn unset(&self, table: &str, key: &str) -> Result<()>;

    /// Apply a batch of writes. Ledgers that can do so atomically should
    /// override this; the default applies writes one by one.
    fn apply_batch(&self, writes: Vec<LedgerWrite>) -> Result<()> {
        for write in writes {
            match write {
                LedgerWrite::Set { table, key, value } => self.set(&table, &key, &value)?,
                LedgerWrite::Unset { table, key } => self.unset(&table, &key)?,
            }
        }
        Ok(())
    }

    /// Read a value, mapping the empty-string sentinel to `None`.
    fn lookup(&self, table: &str, key: &str) -> Result<Option<String>> {
        let value = self.get(table, key)?;
        Ok((!value.is_empty()).then_some(value))
    }

    fn contains(&self, table: &str, key: &str) -> Result<bool> {
        Ok(!self.get(table, key)?.is_empty())
    }
}
