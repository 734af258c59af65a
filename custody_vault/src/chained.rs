// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persistent doubly linked list over a flat ledger.
//!
//! Each node lives in its own ledger table (named by the node id) with three
//! keys: `value`, `prev` and `next`. The owning aggregate stores only the
//! `{first, last, size}` header, so appending or unlinking one element never
//! loads the rest of the collection.

use std::fmt;
use std::marker::PhantomData;

use ledger_store::LedgerStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::trace;

use crate::{context::Invocation, Result, VaultError};

const VALUE: &str = "value";
const PREV: &str = "prev";
const NEXT: &str = "next";

/// A chain of ids referencing independently stored aggregates.
pub type ChainedIds = ChainedCollection<String>;

/// Header of a persistent linked list of `T`.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ChainedCollection<T> {
    first: String,
    last: String,
    size: usize,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T> ChainedCollection<T> {
    pub fn new() -> Self {
        Self {
            first: String::new(),
            last: String::new(),
            size: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Node id of the head, or `""` when empty.
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Node id of the tail, or `""` when empty.
    pub fn last(&self) -> &str {
        &self.last
    }

    fn clear_header(&mut self) {
        self.first.clear();
        self.last.clear();
        self.size = 0;
    }
}

impl<T> Default for ChainedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ChainedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            last: self.last.clone(),
            size: self.size,
            marker: PhantomData,
        }
    }
}

impl<T> PartialEq for ChainedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.first == other.first && self.last == other.last && self.size == other.size
    }
}

impl<T> Eq for ChainedCollection<T> {}

impl<T> fmt::Debug for ChainedCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedCollection")
            .field("first", &self.first)
            .field("last", &self.last)
            .field("size", &self.size)
            .finish()
    }
}

impl<T: Serialize + DeserializeOwned> ChainedCollection<T> {
    /// Append `value` under a freshly minted node id.
    pub fn add(&mut self, inv: &Invocation<'_>, value: &T) -> Result<String> {
        let id = inv.fresh_id()?;
        self.add_with_id(inv.ledger(), id, value)
    }

    /// Append `value` under a caller-chosen node id.
    pub fn add_with_id(&mut self, ledger: &dyn LedgerStore, id: String, value: &T) -> Result<String> {
        if id.is_empty() {
            return Err(VaultError::InvalidArgument(
                "chain node id must not be empty".to_string(),
            ));
        }
        if ledger.contains(&id, VALUE)? {
            return Err(VaultError::AlreadyExists(format!("chain node {id}")));
        }

        ledger.set(&id, VALUE, &serde_json::to_string(value)?)?;
        if self.size == 0 {
            self.first.clone_from(&id);
        } else {
            ledger.set(&id, PREV, &self.last)?;
            ledger.set(&self.last, NEXT, &id)?;
        }
        self.last.clone_from(&id);
        self.size += 1;
        trace!(size = self.size, "chain node appended");
        Ok(id)
    }

    /// Element at `index`; `None` past the end.
    pub fn get(&self, ledger: &dyn LedgerStore, index: usize) -> Result<Option<T>> {
        if index >= self.size {
            return Ok(None);
        }
        let node = self.node_at(ledger, index)?;
        Self::read_value(ledger, &node).map(Some)
    }

    /// Every element in insertion order.
    pub fn get_all(&self, ledger: &dyn LedgerStore) -> Result<Vec<T>> {
        self.iter(ledger).collect()
    }

    /// The first `index` elements. An index past the end yields nothing.
    pub fn get_all_until(&self, ledger: &dyn LedgerStore, index: usize) -> Result<Vec<T>> {
        if index >= self.size {
            return Ok(Vec::new());
        }
        self.iter(ledger).take(index).collect()
    }

    /// Lazy traversal from the head. Each call starts over.
    pub fn iter<'a>(&self, ledger: &'a dyn LedgerStore) -> ChainIter<'a, T> {
        ChainIter {
            ledger,
            cursor: self.first.clone(),
            remaining: self.size,
            marker: PhantomData,
        }
    }

    pub fn position<F>(&self, ledger: &dyn LedgerStore, mut predicate: F) -> Result<Option<usize>>
    where
        F: FnMut(&T) -> bool,
    {
        for (index, item) in self.iter(ledger).enumerate() {
            if predicate(&item?) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    pub fn find<F>(&self, ledger: &dyn LedgerStore, mut predicate: F) -> Result<Option<(usize, T)>>
    where
        F: FnMut(&T) -> bool,
    {
        for (index, item) in self.iter(ledger).enumerate() {
            let item = item?;
            if predicate(&item) {
                return Ok(Some((index, item)));
            }
        }
        Ok(None)
    }

    pub fn contains<F>(&self, ledger: &dyn LedgerStore, predicate: F) -> Result<bool>
    where
        F: FnMut(&T) -> bool,
    {
        Ok(self.position(ledger, predicate)?.is_some())
    }

    /// Unlink the node at `index` and erase its fields. No-op past the end.
    pub fn remove_by_index(&mut self, ledger: &dyn LedgerStore, index: usize) -> Result<()> {
        if index >= self.size {
            return Ok(());
        }
        let node = self.node_at(ledger, index)?;
        let prev = ledger.get(&node, PREV)?;
        let next = ledger.get(&node, NEXT)?;

        if prev.is_empty() {
            self.first.clone_from(&next);
        } else {
            ledger.set(&prev, NEXT, &next)?;
        }
        if next.is_empty() {
            self.last.clone_from(&prev);
        } else {
            ledger.set(&next, PREV, &prev)?;
        }

        Self::erase_node(ledger, &node)?;
        self.size -= 1;
        if self.size == 0 {
            self.clear_header();
        }
        trace!(size = self.size, "chain node removed");
        Ok(())
    }

    /// Remove the first element matching `predicate`, returning it.
    pub fn remove_where<F>(&mut self, ledger: &dyn LedgerStore, predicate: F) -> Result<Option<T>>
    where
        F: FnMut(&T) -> bool,
    {
        match self.find(ledger, predicate)? {
            Some((index, item)) => {
                self.remove_by_index(ledger, index)?;
                Ok(Some(item))
            },
            None => Ok(None),
        }
    }

    /// Erase every node and empty the header. Idempotent.
    pub fn reset(&mut self, ledger: &dyn LedgerStore) -> Result<()> {
        let mut cursor = std::mem::take(&mut self.first);
        let mut visited = 0;
        while !cursor.is_empty() && visited < self.size {
            let next = ledger.get(&cursor, NEXT)?;
            Self::erase_node(ledger, &cursor)?;
            cursor = next;
            visited += 1;
        }
        self.clear_header();
        Ok(())
    }

    fn node_at(&self, ledger: &dyn LedgerStore, index: usize) -> Result<String> {
        let mut cursor = self.first.clone();
        for _ in 0..index {
            cursor = ledger.get(&cursor, NEXT)?;
            if cursor.is_empty() {
                return Err(VaultError::Corrupted(format!(
                    "chain ends before index {index} of {}",
                    self.size
                )));
            }
        }
        Ok(cursor)
    }

    fn read_value(ledger: &dyn LedgerStore, node: &str) -> Result<T> {
        let raw = ledger.get(node, VALUE)?;
        if raw.is_empty() {
            return Err(VaultError::Corrupted(format!("chain node {node} has no value")));
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn erase_node(ledger: &dyn LedgerStore, node: &str) -> Result<()> {
        ledger.unset(node, VALUE)?;
        ledger.unset(node, PREV)?;
        ledger.unset(node, NEXT)?;
        Ok(())
    }
}

/// Iterator over a chain's values, yielding at most `size` elements.
pub struct ChainIter<'a, T> {
    ledger: &'a dyn LedgerStore,
    cursor: String,
    remaining: usize,
    marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + Serialize> Iterator for ChainIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        if self.cursor.is_empty() {
            self.remaining = 0;
            return Some(Err(VaultError::Corrupted(
                "chain ends before its recorded size".to_string(),
            )));
        }
        self.remaining -= 1;
        let node = std::mem::take(&mut self.cursor);
        let item = ChainedCollection::<T>::read_value(self.ledger, &node);
        match self.ledger.get(&node, NEXT) {
            Ok(next) => self.cursor = next,
            Err(e) => {
                self.remaining = 0;
                return Some(Err(e.into()));
            },
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
