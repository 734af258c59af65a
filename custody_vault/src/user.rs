// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vault profiles and their wallet memberships.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    chained::ChainedCollection, context::Invocation, provider::ProviderError, Result, VaultError,
    VaultRole, WalletRole,
};

pub(crate) const USERS_TABLE: &str = "UsersTable";
pub(crate) const MEMBERSHIPS_TABLE: &str = "WalletUsersTable";

/// Binding of one user to one wallet with a wallet-scope role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMembership {
    pub id: String,
    pub wallet_id: String,
    pub role: WalletRole,
}

impl WalletMembership {
    pub fn load(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        inv.load_json(MEMBERSHIPS_TABLE, id)?
            .ok_or_else(|| VaultError::NotFound(format!("membership {id}")))
    }
}

/// Public view of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub role: VaultRole,
}

/// A principal registered with the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultUser {
    pub id: String,
    pub role: VaultRole,
    /// Base64 SEC1 public key imported into the provider at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub memberships: ChainedCollection<WalletMembership>,
}

impl VaultUser {
    /// Register a new profile. Fails with `AlreadyExists` if `id` is taken.
    pub fn create(
        inv: &Invocation<'_>,
        id: &str,
        role: VaultRole,
        public_key: Option<&str>,
    ) -> Result<Self> {
        if id.is_empty() {
            return Err(VaultError::InvalidArgument(
                "user id must not be empty".to_string(),
            ));
        }
        if Self::exists(inv, id)? {
            return Err(VaultError::AlreadyExists(format!("user {id}")));
        }

        if let Some(encoded) = public_key {
            let raw = STANDARD.decode(encoded).map_err(|e| {
                VaultError::InvalidArgument(format!("public key is not base64: {e}"))
            })?;
            let handle = inv.config().verifying_key_handle(id);
            inv.crypto().import_verifying_key(&handle, &raw)?;
        }

        let user = Self {
            id: id.to_string(),
            role,
            public_key: public_key.map(str::to_string),
            memberships: ChainedCollection::new(),
        };
        if let Err(e) = user.save(inv) {
            user.revoke_quietly(inv);
            return Err(e);
        }
        info!(user = %user.id, role = %role, "profile created");
        Ok(user)
    }

    /// Best-effort removal of the imported verifying key when a later step
    /// of the creating call fails.
    pub(crate) fn revoke_quietly(&self, inv: &Invocation<'_>) {
        if self.public_key.is_none() {
            return;
        }
        let handle = inv.config().verifying_key_handle(&self.id);
        if let Err(e) = inv.crypto().delete_key(&handle) {
            warn!(user = %self.id, error = %e, "failed to revoke orphaned verifying key");
        }
    }

    pub fn load(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        Self::try_load(inv, id)?.ok_or_else(|| VaultError::NotFound(format!("user {id}")))
    }

    pub fn try_load(inv: &Invocation<'_>, id: &str) -> Result<Option<Self>> {
        if id.is_empty() {
            return Ok(None);
        }
        inv.load_json(USERS_TABLE, id)
    }

    pub fn exists(inv: &Invocation<'_>, id: &str) -> Result<bool> {
        Ok(!id.is_empty() && inv.ledger().contains(USERS_TABLE, id)?)
    }

    pub fn save(&self, inv: &Invocation<'_>) -> Result<()> {
        debug!(user = %self.id, "saving profile");
        inv.store_json(USERS_TABLE, &self.id, self)
    }

    /// Erase the profile, its membership rows and any imported verifying key.
    ///
    /// Returns the ids of wallets the user belonged to, so the caller can
    /// unlink the user from each wallet's member chain.
    pub fn delete(inv: &Invocation<'_>, id: &str) -> Result<Vec<String>> {
        let mut user = Self::load(inv, id)?;
        let memberships = user.memberships.get_all(inv.ledger())?;
        for membership in &memberships {
            inv.erase(MEMBERSHIPS_TABLE, &membership.id)?;
        }
        user.memberships.reset(inv.ledger())?;

        if user.public_key.is_some() {
            let handle = inv.config().verifying_key_handle(id);
            match inv.crypto().delete_key(&handle) {
                Ok(()) | Err(ProviderError::UnknownHandle(_)) => {},
                Err(e) => return Err(e.into()),
            }
        }

        inv.erase(USERS_TABLE, id)?;
        info!(user = %id, "profile deleted");
        Ok(memberships.into_iter().map(|m| m.wallet_id).collect())
    }

    pub fn membership(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
    ) -> Result<Option<WalletMembership>> {
        Ok(self
            .memberships
            .find(inv.ledger(), |m| m.wallet_id == wallet_id)?
            .map(|(_, membership)| membership))
    }

    /// Record a new membership. Fails with `AlreadyExists` when the user
    /// already belongs to `wallet_id`.
    pub fn add_membership(
        &mut self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        role: WalletRole,
    ) -> Result<WalletMembership> {
        if self.membership(inv, wallet_id)?.is_some() {
            return Err(VaultError::AlreadyExists(format!(
                "user {} is already a member of wallet {wallet_id}",
                self.id
            )));
        }
        let membership = WalletMembership {
            id: inv.fresh_id()?,
            wallet_id: wallet_id.to_string(),
            role,
        };
        self.memberships
            .add_with_id(inv.ledger(), membership.id.clone(), &membership)?;
        inv.store_json(MEMBERSHIPS_TABLE, &membership.id, &membership)?;
        Ok(membership)
    }

    pub fn remove_membership(
        &mut self,
        inv: &Invocation<'_>,
        wallet_id: &str,
    ) -> Result<WalletMembership> {
        let removed = self
            .memberships
            .remove_where(inv.ledger(), |m| m.wallet_id == wallet_id)?
            .ok_or_else(|| {
                VaultError::NotFound(format!(
                    "user {} is not a member of wallet {wallet_id}",
                    self.id
                ))
            })?;
        inv.erase(MEMBERSHIPS_TABLE, &removed.id)?;
        Ok(removed)
    }

    pub fn wallet_ids(&self, inv: &Invocation<'_>) -> Result<Vec<String>> {
        self.memberships
            .iter(inv.ledger())
            .map(|m| m.map(|m| m.wallet_id))
            .collect()
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id.clone(),
            role: self.role,
        }
    }
}
