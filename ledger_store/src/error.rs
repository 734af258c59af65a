// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for ledger access.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    /// The backing store rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// The ledger has been frozen and no longer accepts writes.
    #[error("ledger is read-only: {0}")]
    ReadOnly(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
