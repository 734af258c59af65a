// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wallets: named custody boundaries owning keys and member bindings.
//!
//! Authorization inside a wallet is decided only by the caller's
//! [`WalletMembership`](crate::WalletMembership) for that wallet. Vault-level
//! admin status confers nothing here.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    chained::{ChainedCollection, ChainedIds},
    context::Invocation,
    key::Key,
    user::VaultUser,
    KeyAlgorithm, Result, VaultError, WalletRole,
};

pub(crate) const WALLET_TABLE: &str = "WalletTable";

/// Public view of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub id: String,
    pub name: String,
}

/// A wallet member and their role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub user_id: String,
    pub role: WalletRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub name: String,
    pub keys: ChainedCollection<Key>,
    /// Ids of member profiles.
    pub members: ChainedIds,
}

impl Wallet {
    /// Create and persist a wallet administered by the caller.
    ///
    /// The caller must already hold a vault profile.
    pub fn create(inv: &Invocation<'_>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(VaultError::InvalidArgument(
                "wallet name must not be empty".to_string(),
            ));
        }
        let mut wallet = Self {
            id: inv.fresh_id()?,
            name: name.to_string(),
            keys: ChainedCollection::new(),
            members: ChainedIds::new(),
        };
        wallet.grant_membership(inv, inv.sender(), WalletRole::Admin)?;
        wallet.save(inv)?;
        info!(wallet = %wallet.name, admin = %inv.sender(), "wallet created");
        Ok(wallet)
    }

    pub fn load(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        Self::try_load(inv, id)?.ok_or_else(|| VaultError::NotFound(format!("wallet {id}")))
    }

    pub fn try_load(inv: &Invocation<'_>, id: &str) -> Result<Option<Self>> {
        inv.load_json(WALLET_TABLE, id)
    }

    pub fn save(&self, inv: &Invocation<'_>) -> Result<()> {
        debug!(wallet = %self.name, keys = self.keys.len(), "saving wallet");
        inv.store_json(WALLET_TABLE, &self.id, self)
    }

    /// Destroy every key (revoking provider material), unbind every member
    /// and erase the wallet row.
    pub fn delete(inv: &Invocation<'_>, id: &str) -> Result<()> {
        let mut wallet = Self::load(inv, id)?;
        wallet.destroy_keys(inv)?;
        for user_id in wallet.members.get_all(inv.ledger())? {
            Self::unbind(inv, &wallet.id, &user_id)?;
        }
        wallet.members.reset(inv.ledger())?;
        inv.erase(WALLET_TABLE, &wallet.id)?;
        info!(wallet = %wallet.name, "wallet deleted");
        Ok(())
    }

    pub fn info(&self) -> WalletInfo {
        WalletInfo {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    // ---------- Authorization ----------

    /// Role of `user_id` in this wallet, if any.
    pub fn member_role(&self, inv: &Invocation<'_>, user_id: &str) -> Result<Option<WalletRole>> {
        let Some(user) = VaultUser::try_load(inv, user_id)? else {
            return Ok(None);
        };
        Ok(user.membership(inv, &self.id)?.map(|m| m.role))
    }

    pub fn sender_role(&self, inv: &Invocation<'_>) -> Result<Option<WalletRole>> {
        self.member_role(inv, inv.sender())
    }

    pub fn is_admin(&self, inv: &Invocation<'_>) -> Result<bool> {
        self.sender_allows(inv, WalletRole::Admin)
    }

    /// True for `admin` and `internalUser`.
    pub fn is_internal_user(&self, inv: &Invocation<'_>) -> Result<bool> {
        self.sender_allows(inv, WalletRole::InternalUser)
    }

    /// True for any membership.
    pub fn is_external_user(&self, inv: &Invocation<'_>) -> Result<bool> {
        self.sender_allows(inv, WalletRole::ExternalUser)
    }

    pub fn is_registered(&self, inv: &Invocation<'_>) -> Result<bool> {
        Ok(self.sender_role(inv)?.is_some())
    }

    fn sender_allows(&self, inv: &Invocation<'_>, required: WalletRole) -> Result<bool> {
        Ok(self
            .sender_role(inv)?
            .is_some_and(|role| role.allows(required)))
    }

    pub(crate) fn require(&self, inv: &Invocation<'_>, required: WalletRole, action: &str) -> Result<()> {
        if self.sender_allows(inv, required)? {
            return Ok(());
        }
        warn!(sender = %inv.sender(), wallet = %self.name, action, "wallet access denied");
        Err(VaultError::Unauthorized(format!(
            "{action} in wallet {} requires role {required}",
            self.name
        )))
    }

    // ---------- Membership ----------

    /// Bind `user_id` to this wallet without an authorization check.
    pub(crate) fn grant_membership(
        &mut self,
        inv: &Invocation<'_>,
        user_id: &str,
        role: WalletRole,
    ) -> Result<()> {
        let mut user = VaultUser::load(inv, user_id)?;
        user.add_membership(inv, &self.id, role)?;
        user.save(inv)?;
        self.members.add(inv, &user.id)?;
        Ok(())
    }

    pub(crate) fn revoke_membership(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<()> {
        if self
            .members
            .remove_where(inv.ledger(), |id| id == user_id)?
            .is_none()
        {
            return Err(VaultError::NotFound(format!(
                "user {user_id} is not a member of wallet {}",
                self.name
            )));
        }
        Self::unbind(inv, &self.id, user_id)
    }

    // Drop the user-side membership; tolerates profiles that are already gone.
    fn unbind(inv: &Invocation<'_>, wallet_id: &str, user_id: &str) -> Result<()> {
        if let Some(mut user) = VaultUser::try_load(inv, user_id)? {
            if user.membership(inv, wallet_id)?.is_some() {
                user.remove_membership(inv, wallet_id)?;
                user.save(inv)?;
            }
        }
        Ok(())
    }

    pub fn add_user(&mut self, inv: &Invocation<'_>, user_id: &str, role: WalletRole) -> Result<()> {
        self.require(inv, WalletRole::Admin, "add users")?;
        self.grant_membership(inv, user_id, role)?;
        info!(wallet = %self.name, user = %user_id, role = %role, "wallet member added");
        Ok(())
    }

    pub fn remove_user(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<()> {
        self.require(inv, WalletRole::Admin, "remove users")?;
        self.revoke_membership(inv, user_id)?;
        info!(wallet = %self.name, user = %user_id, "wallet member removed");
        Ok(())
    }

    pub fn list_users(&self, inv: &Invocation<'_>) -> Result<Vec<MemberInfo>> {
        self.require(inv, WalletRole::Admin, "list users")?;
        let mut members = Vec::with_capacity(self.members.len());
        for user_id in self.members.iter(inv.ledger()) {
            let user_id = user_id?;
            if let Some(role) = self.member_role(inv, &user_id)? {
                members.push(MemberInfo { user_id, role });
            }
        }
        Ok(members)
    }

    // ---------- Administration ----------

    /// Rename the wallet. `old_name` must match the current name.
    pub fn rename(&mut self, inv: &Invocation<'_>, old_name: &str, new_name: &str) -> Result<()> {
        self.require(inv, WalletRole::Admin, "rename")?;
        if self.name != old_name {
            return Err(VaultError::InvalidArgument(format!(
                "wallet is named {}, not {old_name}",
                self.name
            )));
        }
        if new_name.is_empty() {
            return Err(VaultError::InvalidArgument(
                "wallet name must not be empty".to_string(),
            ));
        }
        info!(from = %self.name, to = %new_name, "wallet renamed");
        self.name = new_name.to_string();
        Ok(())
    }

    /// Destroy the listed keys, or with an empty list destroy every key and
    /// remove every member except the caller.
    pub fn reset(&mut self, inv: &Invocation<'_>, key_ids: &[String]) -> Result<()> {
        self.require(inv, WalletRole::Admin, "reset")?;
        if key_ids.is_empty() {
            self.destroy_keys(inv)?;
            for user_id in self.members.get_all(inv.ledger())? {
                if user_id != inv.sender() {
                    Self::unbind(inv, &self.id, &user_id)?;
                }
            }
            self.members.reset(inv.ledger())?;
            self.members.add(inv, &inv.sender().to_string())?;
            info!(wallet = %self.name, "wallet reset");
        } else {
            for key_id in key_ids {
                if let Some(index) = self.keys.position(inv.ledger(), |k| &k.id == key_id)? {
                    Key::delete(inv, key_id)?;
                    self.keys.remove_by_index(inv.ledger(), index)?;
                }
            }
            info!(wallet = %self.name, keys = key_ids.len(), "wallet keys reset");
        }
        Ok(())
    }

    fn destroy_keys(&mut self, inv: &Invocation<'_>) -> Result<()> {
        for key in self.keys.get_all(inv.ledger())? {
            Key::delete(inv, &key.id)?;
        }
        self.keys.reset(inv.ledger())
    }

    // ---------- Keys ----------

    pub fn create_key(&mut self, inv: &Invocation<'_>, description: &str, algorithm: &str) -> Result<Key> {
        self.require(inv, WalletRole::InternalUser, "create keys")?;
        let algorithm: KeyAlgorithm = algorithm.parse()?;
        self.mint_key(inv, description, algorithm)
    }

    /// Create a key without an authorization check.
    pub(crate) fn mint_key(
        &mut self,
        inv: &Invocation<'_>,
        description: &str,
        algorithm: KeyAlgorithm,
    ) -> Result<Key> {
        let key = Key::create(inv, description, algorithm)?;
        if let Err(e) = self.keys.add(inv, &key) {
            key.revoke_quietly(inv);
            return Err(e);
        }
        Ok(key)
    }

    pub fn delete_key(&mut self, inv: &Invocation<'_>, key_id: &str) -> Result<()> {
        self.require(inv, WalletRole::InternalUser, "delete keys")?;
        let index = self
            .keys
            .position(inv.ledger(), |k| k.id == key_id)?
            .ok_or_else(|| self.missing_key(key_id))?;
        Key::delete(inv, key_id)?;
        self.keys.remove_by_index(inv.ledger(), index)
    }

    pub fn list_keys(&self, inv: &Invocation<'_>) -> Result<Vec<Key>> {
        self.require(inv, WalletRole::InternalUser, "list keys")?;
        self.keys.get_all(inv.ledger())
    }

    /// Resolve a key that belongs to this wallet, for any member.
    fn usable_key(&self, inv: &Invocation<'_>, key_id: &str, action: &str) -> Result<Key> {
        self.require(inv, WalletRole::ExternalUser, action)?;
        self.keys
            .find(inv.ledger(), |k| k.id == key_id)?
            .map(|(_, key)| key)
            .ok_or_else(|| self.missing_key(key_id))
    }

    fn missing_key(&self, key_id: &str) -> VaultError {
        VaultError::NotFound(format!("key {key_id} in wallet {}", self.name))
    }

    pub fn sign(&self, inv: &Invocation<'_>, key_id: &str, payload: &str) -> Result<String> {
        self.usable_key(inv, key_id, "sign")?.sign(inv, payload)
    }

    pub fn verify(
        &self,
        inv: &Invocation<'_>,
        key_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<bool> {
        self.usable_key(inv, key_id, "verify")?
            .verify(inv, payload, signature)
    }

    pub fn encrypt(&self, inv: &Invocation<'_>, key_id: &str, plaintext: &str) -> Result<String> {
        self.usable_key(inv, key_id, "encrypt")?
            .encrypt(inv, plaintext)
    }

    pub fn decrypt(&self, inv: &Invocation<'_>, key_id: &str, ciphertext: &str) -> Result<String> {
        self.usable_key(inv, key_id, "decrypt")?
            .decrypt(inv, ciphertext)
    }
}
