// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for custody operations.

use ledger_store::LedgerError;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VaultError {
    /// A referenced vault, profile, wallet, key or request does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The caller's role does not permit the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Unknown key algorithm or role name.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The key exists but its algorithm cannot perform the operation.
    #[error("wrong key type: {0}")]
    WrongKeyType(String),

    #[error("provider failure: {0}")]
    ProviderFailure(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A stored document or chain node could not be decoded.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<ProviderError> for VaultError {
    fn from(err: ProviderError) -> Self {
        Self::ProviderFailure(err.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
