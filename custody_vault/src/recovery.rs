// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vault recovery policy: a backup key plus multi-custody recovery codes.
//!
//! Recovery codes are handed to custodians exactly once. Only their
//! BLAKE2b-256 digests are persisted, and verification compares digests in
//! constant time.

use base64::{engine::general_purpose::STANDARD, Engine};
use blake2::{digest::consts::U32, Blake2b, Digest};
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use crate::{context::Invocation, Result, VaultError};

/// One principal holding a share of recovery authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryCustodian {
    pub id: String,
    /// Base64 BLAKE2b-256 digest of the custodian's recovery code.
    pub code_digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryPolicy {
    pub backup_key: String,
    pub multi_custody: Vec<RecoveryCustodian>,
    /// Wallet holding the vault's recovery key, once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_wallet: Option<String>,
}

impl RecoveryPolicy {
    /// Generate the backup key and enrol the caller as the first custodian.
    ///
    /// Returns the caller's recovery code; it is not stored anywhere.
    pub fn create_default(inv: &Invocation<'_>) -> Result<(Self, String)> {
        let mut policy = Self {
            backup_key: inv.random_token(inv.config().backup_key_bytes)?,
            multi_custody: Vec::new(),
            recovery_wallet: None,
        };
        let code = policy.add_custodian(inv, inv.sender())?;
        Ok((policy, code))
    }

    /// Enrol `user_id` and return their freshly generated recovery code.
    pub fn add_custodian(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<String> {
        if self.is_custodian(user_id) {
            return Err(VaultError::AlreadyExists(format!(
                "recovery custodian {user_id}"
            )));
        }
        let code = inv.random_token(inv.config().recovery_code_bytes)?;
        self.multi_custody.push(RecoveryCustodian {
            id: user_id.to_string(),
            code_digest: digest(&code),
        });
        info!(custodian = %user_id, "recovery custodian enrolled");
        Ok(code)
    }

    pub fn remove_custodian(&mut self, user_id: &str) -> Result<()> {
        if !self.forget_custodian(user_id) {
            return Err(VaultError::NotFound(format!(
                "recovery custodian {user_id}"
            )));
        }
        info!(custodian = %user_id, "recovery custodian removed");
        Ok(())
    }

    /// Drop `user_id` if enrolled. Returns whether anything was removed.
    pub(crate) fn forget_custodian(&mut self, user_id: &str) -> bool {
        let before = self.multi_custody.len();
        self.multi_custody.retain(|c| c.id != user_id);
        self.multi_custody.len() != before
    }

    pub fn is_custodian(&self, user_id: &str) -> bool {
        self.multi_custody.iter().any(|c| c.id == user_id)
    }

    pub fn custodians(&self) -> impl Iterator<Item = &str> {
        self.multi_custody.iter().map(|c| c.id.as_str())
    }

    /// Check `code` against the digest enrolled for `user_id`.
    pub fn verify_code(&self, user_id: &str, code: &str) -> bool {
        let Some(custodian) = self.multi_custody.iter().find(|c| c.id == user_id) else {
            return false;
        };
        let Ok(expected) = STANDARD.decode(&custodian.code_digest) else {
            return false;
        };
        constant_time_eq(&expected, &raw_digest(code))
    }
}

fn raw_digest(code: &str) -> Zeroizing<Vec<u8>> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(code.as_bytes());
    Zeroizing::new(hasher.finalize().to_vec())
}

fn digest(code: &str) -> String {
    STANDARD.encode(&*raw_digest(code))
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
