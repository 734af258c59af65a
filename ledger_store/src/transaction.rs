// SPDX-License-Identifier: MIT OR Apache-2.0
//! Buffered write overlay with read-your-writes semantics.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::{LedgerStore, LedgerWrite, Result};

type Slot = (String, String);

/// A transaction over a base ledger.
///
/// Writes are buffered in the overlay and are invisible to the base until
/// [`commit`](Self::commit). Reads consult the overlay first. Dropping an
/// uncommitted transaction discards every buffered write.
pub struct LedgerTransaction<'a> {
    base: &'a dyn LedgerStore,
    // `None` records an unset that shadows the base value.
    overlay: Mutex<BTreeMap<Slot, Option<String>>>,
}

impl<'a> LedgerTransaction<'a> {
    pub fn begin(base: &'a dyn LedgerStore) -> Self {
        Self {
            base,
            overlay: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of distinct slots touched so far.
    pub fn pending(&self) -> usize {
        self.overlay.lock().len()
    }

    pub fn is_dirty(&self) -> bool {
        self.pending() > 0
    }

    /// Flush buffered writes to the base ledger as one batch.
    ///
    /// Returns the number of slots written.
    pub fn commit(self) -> Result<usize> {
        let overlay = self.overlay.into_inner();
        if overlay.is_empty() {
            return Ok(0);
        }
        let writes: Vec<LedgerWrite> = overlay
            .into_iter()
            .map(|((table, key), value)| match value {
                Some(value) => LedgerWrite::Set { table, key, value },
                None => LedgerWrite::Unset { table, key },
            })
            .collect();
        let count = writes.len();
        self.base.apply_batch(writes)?;
        debug!(writes = count, "ledger transaction committed");
        Ok(count)
    }

    /// Discard buffered writes explicitly. Equivalent to dropping.
    pub fn rollback(self) {
        let discarded = self.overlay.lock().len();
        if discarded > 0 {
            debug!(writes = discarded, "ledger transaction rolled back");
        }
    }

    fn stage(&self, table: &str, key: &str, value: Option<String>) {
        self.overlay
            .lock()
            .insert((table.to_string(), key.to_string()), value);
    }
}

impl LedgerStore for LedgerTransaction<'_> {
    fn get(&self, table: &str, key: &str) -> Result<String> {
        let staged = self
            .overlay
            .lock()
            .get(&(table.to_string(), key.to_string()))
            .cloned();
        match staged {
            Some(value) => Ok(value.unwrap_or_default()),
            None => self.base.get(table, key),
        }
    }

    fn set(&self, table: &str, key: &str, value: &str) -> Result<()> {
        let value = (!value.is_empty()).then(|| value.to_string());
        self.stage(table, key, value);
        Ok(())
    }

    fn unset(&self, table: &str, key: &str) -> Result<()> {
        self.stage(table, key, None);
        Ok(())
    }
}
