// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pending proposals awaiting approval.
//!
//! A request is pending while its node sits in one of the vault's request
//! chains. Approval converts it into a membership or a wallet and removes
//! the node; discarding removes the node without conversion. There is no
//! terminal state beyond absence, so a consumed request id is `NotFound`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::{context::Invocation, Result, VaultError, WalletRole};

pub(crate) const ACCESS_REQUESTS_TABLE: &str = "AccessRequestsTable";
pub(crate) const CREATE_REQUESTS_TABLE: &str = "CreateRequestsTable";

/// Shared persistence for request records.
pub trait PendingRequest: Serialize + DeserializeOwned + Clone {
    /// Ledger table holding rows of this request kind.
    const TABLE: &'static str;
    /// Human-readable kind used in error messages.
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// Principal who will receive the role on approval.
    fn user_id(&self) -> &str;

    fn load(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        inv.load_json(Self::TABLE, id)?
            .ok_or_else(|| VaultError::NotFound(format!("{} {id}", Self::KIND)))
    }

    fn save(&self, inv: &Invocation<'_>) -> Result<()> {
        debug!(kind = Self::KIND, "saving request");
        inv.store_json(Self::TABLE, self.id(), self)
    }

    fn erase(inv: &Invocation<'_>, id: &str) -> Result<()> {
        inv.erase(Self::TABLE, id)
    }
}

/// Request to join an existing wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub role: WalletRole,
}

impl AccessRequest {
    pub fn create(
        inv: &Invocation<'_>,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<Self> {
        let request = Self {
            id: inv.fresh_id()?,
            wallet_id: wallet_id.to_string(),
            user_id: user_id.to_string(),
            role,
        };
        request.save(inv)?;
        Ok(request)
    }
}

impl PendingRequest for AccessRequest {
    const TABLE: &'static str = ACCESS_REQUESTS_TABLE;
    const KIND: &'static str = "access request";

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Request for a new wallet, filed by a non-admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletCreationRequest {
    pub id: String,
    pub wallet_name: String,
    pub user_id: String,
    pub role: WalletRole,
}

impl WalletCreationRequest {
    pub fn create(
        inv: &Invocation<'_>,
        wallet_name: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<Self> {
        let request = Self {
            id: inv.fresh_id()?,
            wallet_name: wallet_name.to_string(),
            user_id: user_id.to_string(),
            role,
        };
        request.save(inv)?;
        Ok(request)
    }
}

impl PendingRequest for WalletCreationRequest {
    const TABLE: &'static str = CREATE_REQUESTS_TABLE;
    const KIND: &'static str = "wallet creation request";

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}
