// SPDX-License-Identifier: MIT OR Apache-2.0
//! Custody Vault: vault -> wallet -> key custody with role-based access control.
//!
//! All state lives in a host-provided [`LedgerStore`](ledger_store::LedgerStore)
//! as JSON documents and linked-list nodes. Key material never touches the
//! ledger: it is held by a [`CryptoProvider`] and addressed by key id.
//!
//! Access is controlled at two levels:
//! - vault roles ([`VaultRole`]) gate profile, wallet and workflow management
//! - wallet roles ([`WalletRole`]) gate key creation and use inside a wallet
//!
//! Entry points are on [`CustodyService`], which runs every operation inside
//! a ledger transaction so a failed call leaves no partial writes behind.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

mod chained;
mod config;
mod context;
mod error;
mod key;
mod provider;
mod recovery;
mod request;
mod scoped;
mod service;
mod user;
mod vault;
mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use chained::{ChainIter, ChainedCollection, ChainedIds};
pub use config::VaultConfig;
pub use context::{CallContext, Invocation};
pub use error::{Result, VaultError};
pub use key::Key;
pub use provider::{CryptoProvider, ProviderError, SoftwareProvider};
pub use recovery::{RecoveryCustodian, RecoveryPolicy};
pub use request::{AccessRequest, PendingRequest, WalletCreationRequest};
pub use scoped::ScopedCustody;
pub use service::CustodyService;
pub use user::{UserInfo, VaultUser, WalletMembership};
pub use vault::Vault;
pub use wallet::{MemberInfo, Wallet, WalletInfo};

/// Vault-level role of a registered principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VaultRole {
    #[serde(rename = "admin")]
    Admin,
    #[default]
    #[serde(rename = "user", alias = "external user")]
    User,
}

impl VaultRole {
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for VaultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

impl FromStr for VaultRole {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" | "external user" => Ok(Self::User),
            _ => Err(VaultError::UnsupportedType(format!("vault role '{s}'"))),
        }
    }
}

/// Role of a principal inside one wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletRole {
    /// Manages membership and keys.
    #[serde(rename = "admin")]
    Admin,
    /// Creates, deletes and uses keys.
    #[serde(rename = "internalUser")]
    InternalUser,
    /// Lists and uses keys.
    #[serde(rename = "externalUser")]
    ExternalUser,
}

impl WalletRole {
    /// Check if this role covers everything `required` may do.
    pub fn allows(self, required: Self) -> bool {
        matches!(
            (self, required),
            (Self::Admin, _)
                | (Self::InternalUser, Self::InternalUser | Self::ExternalUser)
                | (Self::ExternalUser, Self::ExternalUser)
        )
    }
}

impl fmt::Display for WalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::InternalUser => write!(f, "internalUser"),
            Self::ExternalUser => write!(f, "externalUser"),
        }
    }
}

impl FromStr for WalletRole {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Self::Admin),
            "internalUser" => Ok(Self::InternalUser),
            "externalUser" => Ok(Self::ExternalUser),
            _ => Err(VaultError::UnsupportedType(format!("wallet role '{s}'"))),
        }
    }
}

/// Algorithm family of a custodied key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// Asymmetric signing key (P-256).
    #[serde(rename = "ECDSA")]
    Ecdsa,
    /// Symmetric encryption key (AES-256-GCM).
    #[serde(rename = "AES")]
    Aes,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ecdsa => write!(f, "ECDSA"),
            Self::Aes => write!(f, "AES"),
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ECDSA" => Ok(Self::Ecdsa),
            "AES" => Ok(Self::Aes),
            _ => Err(VaultError::UnsupportedType(format!("key type '{s}'"))),
        }
    }
}
