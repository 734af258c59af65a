// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory ledger.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;
use tracing::trace;

use crate::{LedgerError, LedgerStore, LedgerWrite, Result};

/// Process-local ledger keyed by table, then key.
///
/// Batches are applied under one write lock, so a reader never observes a
/// partially applied batch.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: RwLock<HashMap<String, HashMap<String, String>>>,
    frozen: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write with [`LedgerError::ReadOnly`].
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn thaw(&self) {
        self.frozen.store(false, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Total number of stored entries across all tables.
    pub fn len(&self) -> usize {
        self.tables.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys currently present in `table`, sorted.
    pub fn keys(&self, table: &str) -> Vec<String> {
        let tables = self.tables.read();
        let mut keys: Vec<String> = tables
            .get(table)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Names of all tables holding at least one entry, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn check_writable(&self, table: &str, key: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(LedgerError::ReadOnly(format!("{table}/{key}")));
        }
        Ok(())
    }

    fn write_locked(tables: &mut HashMap<String, HashMap<String, String>>, write: LedgerWrite) {
        match write {
            LedgerWrite::Set { table, key, value } => {
                tables.entry(table).or_default().insert(key, value);
            },
            LedgerWrite::Unset { table, key } => {
                if let Some(entries) = tables.get_mut(&table) {
                    entries.remove(&key);
                    if entries.is_empty() {
                        tables.remove(&table);
                    }
                }
            },
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn get(&self, table: &str, key: &str) -> Result<String> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|entries| entries.get(key))
            .cloned()
            .unwrap_or_default())
    }

    fn set(&self, table: &str, key: &str, value: &str) -> Result<()> {
        self.check_writable(table, key)?;
        Self::write_locked(&mut self.tables.write(), LedgerWrite::set(table, key, value));
        Ok(())
    }

    fn unset(&self, table: &str, key: &str) -> Result<()> {
        self.check_writable(table, key)?;
        Self::write_locked(&mut self.tables.write(), LedgerWrite::unset(table, key));
        Ok(())
    }

    fn apply_batch(&self, writes: Vec<LedgerWrite>) -> Result<()> {
        let mut tables = self.tables.write();
        if let Some(first) = writes.first() {
            self.check_writable(first.table(), first.key())?;
        }
        trace!(writes = writes.len(), "applying ledger batch");
        for write in writes {
            Self::write_locked(&mut tables, write);
        }
        Ok(())
    }
}
