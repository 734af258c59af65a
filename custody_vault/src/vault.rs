// SPDX-License-Identifier: MIT OR Apache-2.0
//! The vault aggregate: root of all authorized mutation.
//!
//! A ledger holds at most one vault. Operations take an [`Invocation`] that
//! carries the caller, authorize against the caller's vault role (and, for
//! wallet operations, their wallet role), mutate in memory and write back.
//! The vault header itself is persisted by [`Vault::save`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    chained::{ChainedCollection, ChainedIds},
    context::Invocation,
    key::Key,
    recovery::RecoveryPolicy,
    request::{AccessRequest, PendingRequest, WalletCreationRequest},
    user::{UserInfo, VaultUser},
    wallet::{MemberInfo, Wallet, WalletInfo},
    KeyAlgorithm, Result, VaultError, VaultRole, WalletRole,
};

pub(crate) const VAULT_TABLE: &str = "VaultTable";
pub(crate) const VAULT_KEY: &str = "ALL";
const RECOVERY_WALLET_NAME: &str = "recovery";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub name: String,
    pub wallets: ChainedIds,
    pub users: ChainedIds,
    pub access_requests: ChainedCollection<AccessRequest>,
    pub creation_requests: ChainedCollection<WalletCreationRequest>,
    pub recovery_policy: RecoveryPolicy,
}

impl Vault {
    /// Create the vault with the caller as its first admin.
    ///
    /// Returns the vault and the caller's one-time recovery code.
    pub fn create(inv: &Invocation<'_>, name: &str) -> Result<(Self, String)> {
        if Self::exists(inv)? {
            return Err(VaultError::AlreadyExists("vault".to_string()));
        }
        if name.is_empty() {
            return Err(VaultError::InvalidArgument(
                "vault name must not be empty".to_string(),
            ));
        }

        let creator = VaultUser::create(inv, inv.sender(), VaultRole::Admin, None)?;
        let (recovery_policy, code) = RecoveryPolicy::create_default(inv)?;
        let mut vault = Self {
            name: name.to_string(),
            wallets: ChainedIds::new(),
            users: ChainedIds::new(),
            access_requests: ChainedCollection::new(),
            creation_requests: ChainedCollection::new(),
            recovery_policy,
        };
        vault.users.add(inv, &creator.id)?;
        vault.save(inv)?;
        info!(vault = %vault.name, admin = %creator.id, "vault created");
        Ok((vault, code))
    }

    pub fn load(inv: &Invocation<'_>) -> Result<Self> {
        inv.load_json(VAULT_TABLE, VAULT_KEY)?
            .ok_or_else(|| VaultError::NotFound("vault".to_string()))
    }

    pub fn exists(inv: &Invocation<'_>) -> Result<bool> {
        Ok(inv.ledger().contains(VAULT_TABLE, VAULT_KEY)?)
    }

    pub fn save(&self, inv: &Invocation<'_>) -> Result<()> {
        debug!(
            vault = %self.name,
            wallets = self.wallets.len(),
            users = self.users.len(),
            "saving vault"
        );
        inv.store_json(VAULT_TABLE, VAULT_KEY, self)
    }

    // ---------- Authorization ----------

    pub fn is_admin(&self, inv: &Invocation<'_>) -> Result<bool> {
        Ok(VaultUser::try_load(inv, inv.sender())?.is_some_and(|user| user.role.is_admin()))
    }

    pub fn is_registered(&self, inv: &Invocation<'_>) -> Result<bool> {
        VaultUser::exists(inv, inv.sender())
    }

    fn require_admin(&self, inv: &Invocation<'_>, action: &str) -> Result<()> {
        if self.is_admin(inv)? {
            return Ok(());
        }
        Err(Self::denied(inv, action, "vault admin"))
    }

    fn require_registered(&self, inv: &Invocation<'_>, action: &str) -> Result<()> {
        if self.is_registered(inv)? {
            return Ok(());
        }
        Err(Self::denied(inv, action, "a vault profile"))
    }

    fn denied(inv: &Invocation<'_>, action: &str, requirement: &str) -> VaultError {
        warn!(sender = %inv.sender(), action, "vault access denied");
        VaultError::Unauthorized(format!("{action} requires {requirement}"))
    }

    /// Rename the vault. `old_name` must match the current name.
    pub fn rename(&mut self, inv: &Invocation<'_>, old_name: &str, new_name: &str) -> Result<()> {
        self.require_admin(inv, "rename the vault")?;
        if self.name != old_name {
            return Err(VaultError::InvalidArgument(format!(
                "vault is named {}, not {old_name}",
                self.name
            )));
        }
        if new_name.is_empty() {
            return Err(VaultError::InvalidArgument(
                "vault name must not be empty".to_string(),
            ));
        }
        info!(from = %self.name, to = %new_name, "vault renamed");
        self.name = new_name.to_string();
        Ok(())
    }

    // ---------- Profiles ----------

    /// Register a profile.
    ///
    /// Admins may create any profile with any role. Everyone else may only
    /// create their own, and always receives [`VaultRole::User`].
    pub fn create_profile(
        &mut self,
        inv: &Invocation<'_>,
        user_id: &str,
        role: VaultRole,
        public_key: Option<&str>,
    ) -> Result<VaultUser> {
        let role = if self.is_admin(inv)? {
            role
        } else if user_id == inv.sender() {
            VaultRole::User
        } else {
            return Err(Self::denied(inv, "create another user's profile", "vault admin"));
        };
        let user = VaultUser::create(inv, user_id, role, public_key)?;
        if let Err(e) = self.users.add(inv, &user.id) {
            user.revoke_quietly(inv);
            return Err(e);
        }
        Ok(user)
    }

    // Give `user_id` a least-privileged profile if they have none.
    fn provision_profile(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<()> {
        if VaultUser::exists(inv, user_id)? {
            return Ok(());
        }
        let user = VaultUser::create(inv, user_id, VaultRole::User, None)?;
        self.users.add(inv, &user.id)?;
        debug!(user = %user_id, "profile provisioned");
        Ok(())
    }

    /// Delete a profile. Allowed for vault admins and for the user themself.
    ///
    /// The user is unbound from every wallet, loses recovery custody, and any
    /// request filed on their behalf is discarded.
    pub fn delete_profile(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<()> {
        if user_id != inv.sender() {
            self.require_admin(inv, "delete another user's profile")?;
        }
        let wallet_ids = VaultUser::delete(inv, user_id)?;
        for wallet_id in wallet_ids {
            if let Some(mut wallet) = Wallet::try_load(inv, &wallet_id)? {
                wallet
                    .members
                    .remove_where(inv.ledger(), |id| id == user_id)?;
                wallet.save(inv)?;
            }
        }
        self.users.remove_where(inv.ledger(), |id| id == user_id)?;
        self.recovery_policy.forget_custodian(user_id);
        Self::discard_filed_for(&mut self.access_requests, inv, user_id)?;
        Self::discard_filed_for(&mut self.creation_requests, inv, user_id)?;
        info!(user = %user_id, "profile removed from vault");
        Ok(())
    }

    pub fn list_users(&self, inv: &Invocation<'_>) -> Result<Vec<UserInfo>> {
        self.require_admin(inv, "list users")?;
        let mut users = Vec::with_capacity(self.users.len());
        for user_id in self.users.iter(inv.ledger()) {
            let user_id = user_id?;
            match VaultUser::try_load(inv, &user_id)? {
                Some(user) => users.push(user.info()),
                None => warn!(user = %user_id, "vault lists a missing profile"),
            }
        }
        Ok(users)
    }

    // ---------- Wallets ----------

    pub fn create_wallet(&mut self, inv: &Invocation<'_>, name: &str) -> Result<Wallet> {
        self.require_registered(inv, "create a wallet")?;
        self.ensure_wallet_name_free(inv, name)?;
        let wallet = Wallet::create(inv, name)?;
        self.wallets.add(inv, &wallet.id)?;
        Ok(wallet)
    }

    /// Delete a wallet the caller administers, with its keys, memberships
    /// and pending access requests.
    pub fn delete_wallet(&mut self, inv: &Invocation<'_>, wallet_id: &str) -> Result<()> {
        self.require_registered(inv, "delete a wallet")?;
        let wallet = Wallet::load(inv, wallet_id)?;
        if !wallet.is_admin(inv)? {
            return Err(Self::denied(inv, "delete a wallet", "wallet admin"));
        }
        self.remove_wallet(inv, wallet_id)
    }

    // Unauthenticated teardown shared by delete_wallet and reset.
    fn remove_wallet(&mut self, inv: &Invocation<'_>, wallet_id: &str) -> Result<()> {
        Wallet::delete(inv, wallet_id)?;
        self.wallets.remove_where(inv.ledger(), |id| id == wallet_id)?;
        self.discard_access_requests_where(inv, |r| r.wallet_id == wallet_id)?;
        if self.recovery_policy.recovery_wallet.as_deref() == Some(wallet_id) {
            self.recovery_policy.recovery_wallet = None;
        }
        Ok(())
    }

    fn ensure_wallet_name_free(&self, inv: &Invocation<'_>, name: &str) -> Result<()> {
        for wallet_id in self.wallets.iter(inv.ledger()) {
            if let Some(wallet) = Wallet::try_load(inv, &wallet_id?)? {
                if wallet.name == name {
                    return Err(VaultError::AlreadyExists(format!("wallet named {name}")));
                }
            }
        }
        Ok(())
    }

    /// Wallets visible to the caller.
    ///
    /// Admins may list every wallet or any user's wallets. Other registered
    /// users may only list their own.
    pub fn list_wallets(&self, inv: &Invocation<'_>, user_id: Option<&str>) -> Result<Vec<WalletInfo>> {
        let admin = self.is_admin(inv)?;
        match user_id {
            None if admin => {
                let mut wallets = Vec::with_capacity(self.wallets.len());
                for wallet_id in self.wallets.iter(inv.ledger()) {
                    let wallet_id = wallet_id?;
                    match Wallet::try_load(inv, &wallet_id)? {
                        Some(wallet) => wallets.push(wallet.info()),
                        None => warn!(wallet = %wallet_id, "vault lists a missing wallet"),
                    }
                }
                Ok(wallets)
            },
            Some(user_id) if admin || user_id == inv.sender() => {
                let user = VaultUser::load(inv, user_id)?;
                Self::wallets_of(inv, &user)
            },
            None => {
                self.require_registered(inv, "list wallets")?;
                let user = VaultUser::load(inv, inv.sender())?;
                Self::wallets_of(inv, &user)
            },
            Some(_) => Err(Self::denied(inv, "list another user's wallets", "vault admin")),
        }
    }

    fn wallets_of(inv: &Invocation<'_>, user: &VaultUser) -> Result<Vec<WalletInfo>> {
        let mut wallets = Vec::new();
        for wallet_id in user.wallet_ids(inv)? {
            match Wallet::try_load(inv, &wallet_id)? {
                Some(wallet) => wallets.push(wallet.info()),
                None => warn!(wallet = %wallet_id, user = %user.id, "membership names a missing wallet"),
            }
        }
        Ok(wallets)
    }

    fn open_wallet(&self, inv: &Invocation<'_>, wallet_id: &str, action: &str) -> Result<Wallet> {
        self.require_registered(inv, action)?;
        Wallet::load(inv, wallet_id)
    }

    pub fn add_user_to_wallet(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<()> {
        let mut wallet = self.open_wallet(inv, wallet_id, "add a wallet user")?;
        wallet.add_user(inv, user_id, role)?;
        wallet.save(inv)
    }

    pub fn remove_user_from_wallet(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let mut wallet = self.open_wallet(inv, wallet_id, "remove a wallet user")?;
        wallet.remove_user(inv, user_id)?;
        wallet.save(inv)
    }

    pub fn list_wallet_users(&self, inv: &Invocation<'_>, wallet_id: &str) -> Result<Vec<MemberInfo>> {
        self.open_wallet(inv, wallet_id, "list wallet users")?
            .list_users(inv)
    }

    pub fn rename_wallet(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let mut wallet = self.open_wallet(inv, wallet_id, "rename a wallet")?;
        wallet.require(inv, WalletRole::Admin, "rename")?;
        if wallet.name != new_name {
            self.ensure_wallet_name_free(inv, new_name)?;
        }
        wallet.rename(inv, old_name, new_name)?;
        wallet.save(inv)
    }

    pub fn reset_wallet(&self, inv: &Invocation<'_>, wallet_id: &str, key_ids: &[String]) -> Result<()> {
        let mut wallet = self.open_wallet(inv, wallet_id, "reset a wallet")?;
        wallet.reset(inv, key_ids)?;
        wallet.save(inv)
    }

    // ---------- Keys ----------

    pub fn create_key(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        description: &str,
        algorithm: &str,
    ) -> Result<Key> {
        let mut wallet = self.open_wallet(inv, wallet_id, "create a key")?;
        let key = wallet.create_key(inv, description, algorithm)?;
        if let Err(e) = wallet.save(inv) {
            key.revoke_quietly(inv);
            return Err(e);
        }
        Ok(key)
    }

    pub fn delete_key(&self, inv: &Invocation<'_>, wallet_id: &str, key_id: &str) -> Result<()> {
        let mut wallet = self.open_wallet(inv, wallet_id, "delete a key")?;
        wallet.delete_key(inv, key_id)?;
        wallet.save(inv)
    }

    pub fn list_keys(&self, inv: &Invocation<'_>, wallet_id: &str) -> Result<Vec<Key>> {
        self.open_wallet(inv, wallet_id, "list keys")?.list_keys(inv)
    }

    pub fn sign(&self, inv: &Invocation<'_>, wallet_id: &str, key_id: &str, payload: &str) -> Result<String> {
        self.open_wallet(inv, wallet_id, "sign")?
            .sign(inv, key_id, payload)
    }

    pub fn verify(
        &self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        key_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<bool> {
        self.open_wallet(inv, wallet_id, "verify")?
            .verify(inv, key_id, payload, signature)
    }

    pub fn encrypt(&self, inv: &Invocation<'_>, wallet_id: &str, key_id: &str, plaintext: &str) -> Result<String> {
        self.open_wallet(inv, wallet_id, "encrypt")?
            .encrypt(inv, key_id, plaintext)
    }

    pub fn decrypt(&self, inv: &Invocation<'_>, wallet_id: &str, key_id: &str, ciphertext: &str) -> Result<String> {
        self.open_wallet(inv, wallet_id, "decrypt")?
            .decrypt(inv, key_id, ciphertext)
    }

    // ---------- Access requests ----------

    /// File a request for `user_id` to join `wallet_id` with `role`.
    ///
    /// Non-admin filers may only request for themselves. The target user is
    /// given a least-privileged profile if they have none.
    pub fn register_access_request(
        &mut self,
        inv: &Invocation<'_>,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<AccessRequest> {
        let wallet = Wallet::load(inv, wallet_id)?;
        if wallet.is_admin(inv)? {
            return Err(VaultError::InvalidArgument(format!(
                "wallet admins do not need to request access to {}",
                wallet.name
            )));
        }
        if user_id != inv.sender() && !self.is_admin(inv)? {
            return Err(Self::denied(inv, "request access for another user", "vault admin"));
        }

        self.provision_profile(inv, user_id)?;
        if wallet.member_role(inv, user_id)?.is_some() {
            return Err(VaultError::AlreadyExists(format!(
                "user {user_id} is already a member of wallet {}",
                wallet.name
            )));
        }
        if self.access_requests.contains(inv.ledger(), |r| {
            r.wallet_id == wallet_id && r.user_id == user_id
        })? {
            return Err(VaultError::AlreadyExists(format!(
                "pending access request for {user_id} on wallet {}",
                wallet.name
            )));
        }

        let request = AccessRequest::create(inv, wallet_id, user_id, role)?;
        self.access_requests.add(inv, &request)?;
        info!(wallet = %wallet.name, user = %user_id, role = %role, "access request filed");
        Ok(request)
    }

    /// Grant the requested membership and consume the request.
    ///
    /// Only an admin of the target wallet may approve.
    pub fn approve_access_request(&mut self, inv: &Invocation<'_>, request_id: &str) -> Result<()> {
        let index = Self::pending_index(&self.access_requests, inv, request_id)?;
        let request = AccessRequest::load(inv, request_id)?;
        let mut wallet = Wallet::load(inv, &request.wallet_id)?;
        if !wallet.is_admin(inv)? {
            return Err(Self::denied(inv, "approve an access request", "wallet admin"));
        }

        wallet.grant_membership(inv, &request.user_id, request.role)?;
        wallet.save(inv)?;
        AccessRequest::erase(inv, request_id)?;
        self.access_requests.remove_by_index(inv.ledger(), index)?;
        info!(
            wallet = %wallet.name,
            user = %request.user_id,
            role = %request.role,
            "access request approved"
        );
        Ok(())
    }

    /// Drop a pending access request without granting it.
    ///
    /// Allowed for an admin of the target wallet and for the requester.
    pub fn discard_access_request(&mut self, inv: &Invocation<'_>, request_id: &str) -> Result<()> {
        let index = Self::pending_index(&self.access_requests, inv, request_id)?;
        let request = AccessRequest::load(inv, request_id)?;
        if request.user_id() != inv.sender() {
            let wallet = Wallet::load(inv, &request.wallet_id)?;
            if !wallet.is_admin(inv)? {
                return Err(Self::denied(inv, "discard an access request", "wallet admin"));
            }
        }
        AccessRequest::erase(inv, request_id)?;
        self.access_requests.remove_by_index(inv.ledger(), index)?;
        info!(user = %request.user_id, "access request discarded");
        Ok(())
    }

    /// Pending access requests the caller may act on: all of them for a
    /// vault admin, otherwise those targeting wallets the caller administers.
    pub fn list_access_requests(&self, inv: &Invocation<'_>) -> Result<Vec<AccessRequest>> {
        self.require_registered(inv, "list access requests")?;
        let requests = self.access_requests.get_all(inv.ledger())?;
        if self.is_admin(inv)? {
            return Ok(requests);
        }
        let mut visible = Vec::new();
        for request in requests {
            if let Some(wallet) = Wallet::try_load(inv, &request.wallet_id)? {
                if wallet.is_admin(inv)? {
                    visible.push(request);
                }
            }
        }
        Ok(visible)
    }

    fn discard_access_requests_where<F>(&mut self, inv: &Invocation<'_>, predicate: F) -> Result<()>
    where
        F: Fn(&AccessRequest) -> bool,
    {
        Self::discard_where(&mut self.access_requests, inv, predicate)
    }

    // ---------- Wallet creation requests ----------

    /// File a request for a new wallet. Vault admins create wallets directly
    /// and cannot file; everyone else may only file for themselves.
    pub fn register_wallet_creation_request(
        &mut self,
        inv: &Invocation<'_>,
        wallet_name: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<WalletCreationRequest> {
        if self.is_admin(inv)? {
            return Err(VaultError::InvalidArgument(
                "vault admins create wallets directly".to_string(),
            ));
        }
        if user_id != inv.sender() {
            return Err(Self::denied(inv, "request a wallet for another user", "vault admin"));
        }
        if wallet_name.is_empty() {
            return Err(VaultError::InvalidArgument(
                "wallet name must not be empty".to_string(),
            ));
        }

        self.provision_profile(inv, user_id)?;
        let request = WalletCreationRequest::create(inv, wallet_name, user_id, role)?;
        self.creation_requests.add(inv, &request)?;
        info!(wallet = %wallet_name, user = %user_id, role = %role, "wallet creation request filed");
        Ok(request)
    }

    /// Create the requested wallet with the approving admin as wallet admin,
    /// grant the requester their role, and consume the request.
    pub fn approve_wallet_creation_request(&mut self, inv: &Invocation<'_>, request_id: &str) -> Result<Wallet> {
        self.require_admin(inv, "approve a wallet creation request")?;
        let index = Self::pending_index(&self.creation_requests, inv, request_id)?;
        let request = WalletCreationRequest::load(inv, request_id)?;
        self.ensure_wallet_name_free(inv, &request.wallet_name)?;

        let mut wallet = Wallet::create(inv, &request.wallet_name)?;
        if request.user_id != inv.sender() {
            wallet.grant_membership(inv, &request.user_id, request.role)?;
            wallet.save(inv)?;
        }
        self.wallets.add(inv, &wallet.id)?;
        WalletCreationRequest::erase(inv, request_id)?;
        self.creation_requests.remove_by_index(inv.ledger(), index)?;
        info!(
            wallet = %wallet.name,
            user = %request.user_id,
            role = %request.role,
            "wallet creation request approved"
        );
        Ok(wallet)
    }

    /// Drop a pending wallet creation request. Allowed for vault admins and
    /// for the requester.
    pub fn discard_wallet_creation_request(&mut self, inv: &Invocation<'_>, request_id: &str) -> Result<()> {
        let index = Self::pending_index(&self.creation_requests, inv, request_id)?;
        let request = WalletCreationRequest::load(inv, request_id)?;
        if request.user_id() != inv.sender() {
            self.require_admin(inv, "discard a wallet creation request")?;
        }
        WalletCreationRequest::erase(inv, request_id)?;
        self.creation_requests.remove_by_index(inv.ledger(), index)?;
        info!(user = %request.user_id, "wallet creation request discarded");
        Ok(())
    }

    pub fn list_wallet_creation_requests(&self, inv: &Invocation<'_>) -> Result<Vec<WalletCreationRequest>> {
        self.require_admin(inv, "list wallet creation requests")?;
        self.creation_requests.get_all(inv.ledger())
    }

    fn pending_index<R: PendingRequest>(
        chain: &ChainedCollection<R>,
        inv: &Invocation<'_>,
        request_id: &str,
    ) -> Result<usize> {
        chain
            .position(inv.ledger(), |r| r.id() == request_id)?
            .ok_or_else(|| VaultError::NotFound(format!("{} {request_id}", R::KIND)))
    }

    fn discard_filed_for<R: PendingRequest>(
        chain: &mut ChainedCollection<R>,
        inv: &Invocation<'_>,
        user_id: &str,
    ) -> Result<()> {
        Self::discard_where(chain, inv, |r: &R| r.user_id() == user_id)
    }

    fn discard_where<R, F>(chain: &mut ChainedCollection<R>, inv: &Invocation<'_>, predicate: F) -> Result<()>
    where
        R: PendingRequest,
        F: Fn(&R) -> bool,
    {
        while let Some((index, request)) = chain.find(inv.ledger(), &predicate)? {
            R::erase(inv, request.id())?;
            chain.remove_by_index(inv.ledger(), index)?;
        }
        Ok(())
    }

    // ---------- Recovery ----------

    /// Create an AES recovery key in the dedicated recovery wallet, creating
    /// that wallet (administered by the caller) on first use.
    pub fn create_recovery_key(&mut self, inv: &Invocation<'_>) -> Result<Key> {
        self.require_admin(inv, "create a recovery key")?;
        let mut wallet = match self.recovery_policy.recovery_wallet.clone() {
            Some(wallet_id) => Wallet::load(inv, &wallet_id)?,
            None => {
                self.ensure_wallet_name_free(inv, RECOVERY_WALLET_NAME)?;
                let wallet = Wallet::create(inv, RECOVERY_WALLET_NAME)?;
                self.wallets.add(inv, &wallet.id)?;
                self.recovery_policy.recovery_wallet = Some(wallet.id.clone());
                wallet
            },
        };
        let key = wallet.mint_key(inv, RECOVERY_WALLET_NAME, KeyAlgorithm::Aes)?;
        if let Err(e) = wallet.save(inv) {
            key.revoke_quietly(inv);
            return Err(e);
        }
        info!(wallet = %wallet.name, "recovery key created");
        Ok(key)
    }

    /// Enrol a registered user as recovery custodian; returns their code.
    pub fn add_recovery_custodian(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<String> {
        self.require_admin(inv, "add a recovery custodian")?;
        if !VaultUser::exists(inv, user_id)? {
            return Err(VaultError::NotFound(format!("user {user_id}")));
        }
        self.recovery_policy.add_custodian(inv, user_id)
    }

    pub fn remove_recovery_custodian(&mut self, inv: &Invocation<'_>, user_id: &str) -> Result<()> {
        self.require_admin(inv, "remove a recovery custodian")?;
        self.recovery_policy.remove_custodian(user_id)
    }

    /// Check a recovery code. Custodians may check their own; admins any.
    pub fn verify_recovery_code(&self, inv: &Invocation<'_>, user_id: &str, code: &str) -> Result<bool> {
        if user_id != inv.sender() {
            self.require_admin(inv, "verify another custodian's code")?;
        }
        Ok(self.recovery_policy.verify_code(user_id, code))
    }

    // ---------- Reset ----------

    /// Delete the listed wallets. With an empty list, delete every wallet,
    /// discard every pending request and every profile except the caller's.
    pub fn reset(&mut self, inv: &Invocation<'_>, wallet_ids: &[String]) -> Result<()> {
        self.require_admin(inv, "reset the vault")?;
        if !wallet_ids.is_empty() {
            for wallet_id in wallet_ids {
                if self.wallets.contains(inv.ledger(), |id| id == wallet_id)? {
                    self.remove_wallet(inv, wallet_id)?;
                }
            }
            info!(wallets = wallet_ids.len(), "vault wallets reset");
            return Ok(());
        }

        for wallet_id in self.wallets.get_all(inv.ledger())? {
            if Wallet::try_load(inv, &wallet_id)?.is_some() {
                Wallet::delete(inv, &wallet_id)?;
            }
        }
        self.wallets.reset(inv.ledger())?;
        Self::discard_where(&mut self.access_requests, inv, |_: &AccessRequest| true)?;
        Self::discard_where(
            &mut self.creation_requests,
            inv,
            |_: &WalletCreationRequest| true,
        )?;

        let sender = inv.sender().to_string();
        for user_id in self.users.get_all(inv.ledger())? {
            if user_id != sender && VaultUser::exists(inv, &user_id)? {
                VaultUser::delete(inv, &user_id)?;
                self.recovery_policy.forget_custodian(&user_id);
            }
        }
        self.users.reset(inv.ledger())?;
        self.users.add(inv, &sender)?;
        self.recovery_policy.recovery_wallet = None;
        info!(vault = %self.name, "vault reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fault, TestHost};

    fn bootstrap(host: &TestHost) -> (Vault, String) {
        Vault::create(&host.invocation("alice"), "V").unwrap()
    }

    #[test]
    fn test_create_makes_caller_admin() {
        let host = TestHost::new();
        let (vault, code) = bootstrap(&host);
        let inv = host.invocation("alice");

        assert!(vault.is_admin(&inv).unwrap());
        assert_eq!(Vault::load(&inv).unwrap(), vault);
        assert!(vault.recovery_policy.verify_code("alice", &code));
        assert_eq!(vault.users.get_all(inv.ledger()).unwrap(), vec!["alice"]);
    }

    #[test]
    fn test_create_twice_fails() {
        let host = TestHost::new();
        bootstrap(&host);
        assert!(matches!(
            Vault::create(&host.invocation("bob"), "V2"),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_load_missing_vault() {
        let host = TestHost::new();
        assert!(matches!(
            Vault::load(&host.invocation("alice")),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        vault.create_profile(&host.invocation("bob"), "bob", VaultRole::User, None)
            .unwrap();

        assert!(matches!(
            vault.rename(&host.invocation("bob"), "V", "W"),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.rename(&host.invocation("alice"), "X", "W"),
            Err(VaultError::InvalidArgument(_))
        ));
        vault.rename(&host.invocation("alice"), "V", "W").unwrap();
        assert_eq!(vault.name, "W");
    }

    #[test]
    fn test_non_admin_profile_forced_to_user() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let bob = host.invocation("bob");

        let profile = vault
            .create_profile(&bob, "bob", VaultRole::Admin, None)
            .unwrap();
        assert_eq!(profile.role, VaultRole::User);
        assert!(matches!(
            vault.create_profile(&bob, "carol", VaultRole::User, None),
            Err(VaultError::Unauthorized(_))
        ));

        let admin_made = vault
            .create_profile(&host.invocation("alice"), "dave", VaultRole::Admin, None)
            .unwrap();
        assert_eq!(admin_made.role, VaultRole::Admin);
        assert_eq!(vault.users.len(), 3);
    }

    #[test]
    fn test_delete_profile_gating_and_cascade() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        vault.create_profile(&alice, "bob", VaultRole::User, None).unwrap();
        vault.create_profile(&alice, "carol", VaultRole::User, None).unwrap();
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        vault
            .add_user_to_wallet(&alice, &wallet.id, "bob", WalletRole::InternalUser)
            .unwrap();
        vault.add_recovery_custodian(&alice, "bob").unwrap();

        assert!(matches!(
            vault.delete_profile(&host.invocation("carol"), "bob"),
            Err(VaultError::Unauthorized(_))
        ));
        vault.delete_profile(&host.invocation("carol"), "carol").unwrap();
        vault.delete_profile(&alice, "bob").unwrap();

        let wallet = Wallet::load(&alice, &wallet.id).unwrap();
        assert_eq!(wallet.members.get_all(alice.ledger()).unwrap(), vec!["alice"]);
        assert!(!vault.recovery_policy.is_custodian("bob"));
        assert_eq!(vault.users.get_all(alice.ledger()).unwrap(), vec!["alice"]);
        assert!(matches!(
            vault.delete_profile(&alice, "bob"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_users_requires_admin() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        vault
            .create_profile(&host.invocation("bob"), "bob", VaultRole::User, None)
            .unwrap();

        let users = vault.list_users(&host.invocation("alice")).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].role, VaultRole::Admin);
        assert!(matches!(
            vault.list_users(&host.invocation("bob")),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_create_wallet_requires_profile_and_unique_name() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");

        let wallet = vault.create_wallet(&alice, "W").unwrap();
        assert!(wallet.is_admin(&alice).unwrap());
        assert!(matches!(
            vault.create_wallet(&alice, "W"),
            Err(VaultError::AlreadyExists(_))
        ));
        assert!(matches!(
            vault.create_wallet(&host.invocation("mallory"), "M"),
            Err(VaultError::Unauthorized(_))
        ));
        assert_eq!(vault.wallets.len(), 1);
    }

    #[test]
    fn test_delete_wallet_requires_wallet_admin() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        vault.create_profile(&alice, "bob", VaultRole::User, None).unwrap();
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        let key = vault.create_key(&alice, &wallet.id, "k", "ECDSA").unwrap();
        let bob = host.invocation("bob");
        let request = vault
            .register_access_request(&bob, &wallet.id, "bob", WalletRole::ExternalUser)
            .unwrap();

        assert!(matches!(
            vault.delete_wallet(&bob, &wallet.id),
            Err(VaultError::Unauthorized(_))
        ));
        vault.delete_wallet(&alice, &wallet.id).unwrap();

        assert!(vault.wallets.is_empty());
        assert!(vault.access_requests.is_empty());
        assert!(!host.crypto.holds(&key.id));
        assert!(matches!(
            AccessRequest::load(&alice, &request.id),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            vault.delete_wallet(&alice, &wallet.id),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_wallets_visibility() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        vault.create_profile(&bob, "bob", VaultRole::User, None).unwrap();
        let w1 = vault.create_wallet(&alice, "W1").unwrap();
        let w2 = vault.create_wallet(&bob, "W2").unwrap();

        assert_eq!(
            vault.list_wallets(&alice, None).unwrap(),
            vec![w1.info(), w2.info()]
        );
        assert_eq!(vault.list_wallets(&alice, Some("bob")).unwrap(), vec![w2.info()]);
        assert_eq!(vault.list_wallets(&bob, None).unwrap(), vec![w2.info()]);
        assert_eq!(vault.list_wallets(&bob, Some("bob")).unwrap(), vec![w2.info()]);
        assert!(matches!(
            vault.list_wallets(&bob, Some("alice")),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.list_wallets(&host.invocation("ghost"), None),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.list_wallets(&alice, Some("ghost")),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_wallet_authorizes_before_name_check() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        vault.create_profile(&alice, "bob", VaultRole::User, None).unwrap();
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        vault.create_wallet(&alice, "taken").unwrap();
        vault
            .add_user_to_wallet(&alice, &wallet.id, "bob", WalletRole::InternalUser)
            .unwrap();

        assert!(matches!(
            vault.rename_wallet(&bob, &wallet.id, "W", "taken"),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.rename_wallet(&alice, &wallet.id, "W", "taken"),
            Err(VaultError::AlreadyExists(_))
        ));
        vault.rename_wallet(&alice, &wallet.id, "W", "Treasury").unwrap();
        assert_eq!(Wallet::load(&alice, &wallet.id).unwrap().name, "Treasury");
    }

    #[test]
    fn test_wallet_operations_require_vault_profile() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let wallet = vault.create_wallet(&host.invocation("alice"), "W").unwrap();
        let ghost = host.invocation("ghost");

        assert!(matches!(
            vault.list_keys(&ghost, &wallet.id),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.sign(&ghost, &wallet.id, "k", "x"),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_access_request_flow() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        let wallet = vault.create_wallet(&alice, "W").unwrap();

        let request = vault
            .register_access_request(&bob, &wallet.id, "bob", WalletRole::InternalUser)
            .unwrap();
        assert_eq!(VaultUser::load(&bob, "bob").unwrap().role, VaultRole::User);
        assert_eq!(vault.access_requests.len(), 1);

        assert!(matches!(
            vault.approve_access_request(&bob, &request.id),
            Err(VaultError::Unauthorized(_))
        ));
        vault.approve_access_request(&alice, &request.id).unwrap();
        assert!(vault.access_requests.is_empty());

        let wallet = Wallet::load(&alice, &wallet.id).unwrap();
        assert_eq!(
            wallet.member_role(&alice, "bob").unwrap(),
            Some(WalletRole::InternalUser)
        );
        assert!(matches!(
            vault.approve_access_request(&alice, &request.id),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_access_request_rules() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        let wallet = vault.create_wallet(&alice, "W").unwrap();

        assert!(matches!(
            vault.register_access_request(&alice, &wallet.id, "alice", WalletRole::Admin),
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(matches!(
            vault.register_access_request(&bob, &wallet.id, "carol", WalletRole::Admin),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.register_access_request(&bob, "missing", "bob", WalletRole::Admin),
            Err(VaultError::NotFound(_))
        ));

        vault
            .register_access_request(&bob, &wallet.id, "bob", WalletRole::ExternalUser)
            .unwrap();
        assert!(matches!(
            vault.register_access_request(&bob, &wallet.id, "bob", WalletRole::InternalUser),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_vault_admin_files_for_others() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        vault.create_profile(&alice, "bob", VaultRole::User, None).unwrap();
        let wallet = vault.create_wallet(&host.invocation("bob"), "B").unwrap();

        let request = vault
            .register_access_request(&alice, &wallet.id, "carol", WalletRole::ExternalUser)
            .unwrap();
        assert!(VaultUser::exists(&alice, "carol").unwrap());
        // the vault admin is not an admin of bob's wallet
        assert!(matches!(
            vault.approve_access_request(&alice, &request.id),
            Err(VaultError::Unauthorized(_))
        ));
        vault
            .approve_access_request(&host.invocation("bob"), &request.id)
            .unwrap();
    }

    #[test]
    fn test_existing_member_cannot_request() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        vault.create_profile(&alice, "bob", VaultRole::User, None).unwrap();
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        vault
            .add_user_to_wallet(&alice, &wallet.id, "bob", WalletRole::ExternalUser)
            .unwrap();

        assert!(matches!(
            vault.register_access_request(
                &host.invocation("bob"),
                &wallet.id,
                "bob",
                WalletRole::InternalUser
            ),
            Err(VaultError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_discard_access_request() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        let carol = host.invocation("carol");
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        let by_bob = vault
            .register_access_request(&bob, &wallet.id, "bob", WalletRole::ExternalUser)
            .unwrap();
        let by_carol = vault
            .register_access_request(&carol, &wallet.id, "carol", WalletRole::ExternalUser)
            .unwrap();

        assert!(matches!(
            vault.discard_access_request(&carol, &by_bob.id),
            Err(VaultError::Unauthorized(_))
        ));
        vault.discard_access_request(&bob, &by_bob.id).unwrap();
        vault.discard_access_request(&alice, &by_carol.id).unwrap();
        assert!(vault.access_requests.is_empty());
        assert!(Wallet::load(&alice, &wallet.id)
            .unwrap()
            .member_role(&alice, "bob")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_access_requests_scoped_to_wallet_admins() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        vault.create_profile(&bob, "bob", VaultRole::User, None).unwrap();
        let alice_wallet = vault.create_wallet(&alice, "A").unwrap();
        let bob_wallet = vault.create_wallet(&bob, "B").unwrap();
        let carol = host.invocation("carol");
        vault
            .register_access_request(&carol, &alice_wallet.id, "carol", WalletRole::ExternalUser)
            .unwrap();
        let for_bob = vault
            .register_access_request(&carol, &bob_wallet.id, "carol", WalletRole::ExternalUser)
            .unwrap();

        assert_eq!(vault.list_access_requests(&alice).unwrap().len(), 2);
        assert_eq!(vault.list_access_requests(&bob).unwrap(), vec![for_bob]);
        assert!(vault.list_access_requests(&carol).unwrap().is_empty());
        assert!(matches!(
            vault.list_access_requests(&host.invocation("ghost")),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wallet_creation_request_flow() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");

        let request = vault
            .register_wallet_creation_request(&bob, "savings", "bob", WalletRole::InternalUser)
            .unwrap();
        assert_eq!(
            vault.list_wallet_creation_requests(&alice).unwrap(),
            vec![request.clone()]
        );
        assert!(matches!(
            vault.list_wallet_creation_requests(&bob),
            Err(VaultError::Unauthorized(_))
        ));
        assert!(matches!(
            vault.approve_wallet_creation_request(&bob, &request.id),
            Err(VaultError::Unauthorized(_))
        ));

        let wallet = vault
            .approve_wallet_creation_request(&alice, &request.id)
            .unwrap();
        assert_eq!(wallet.name, "savings");
        assert!(wallet.is_admin(&alice).unwrap());
        assert_eq!(
            wallet.member_role(&alice, "bob").unwrap(),
            Some(WalletRole::InternalUser)
        );
        assert!(vault.creation_requests.is_empty());
        assert!(vault.wallets.contains(alice.ledger(), |id| id == &wallet.id).unwrap());
        assert!(matches!(
            vault.approve_wallet_creation_request(&alice, &request.id),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_wallet_creation_request_rules() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");

        assert!(matches!(
            vault.register_wallet_creation_request(&alice, "x", "alice", WalletRole::Admin),
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(matches!(
            vault.register_wallet_creation_request(&bob, "x", "carol", WalletRole::Admin),
            Err(VaultError::Unauthorized(_))
        ));

        vault.create_wallet(&alice, "taken").unwrap();
        let request = vault
            .register_wallet_creation_request(&bob, "taken", "bob", WalletRole::Admin)
            .unwrap();
        assert!(matches!(
            vault.approve_wallet_creation_request(&alice, &request.id),
            Err(VaultError::AlreadyExists(_))
        ));

        vault.discard_wallet_creation_request(&bob, &request.id).unwrap();
        assert!(vault.creation_requests.is_empty());
    }

    #[test]
    fn test_recovery_key_reuses_wallet() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");

        let first = vault.create_recovery_key(&alice).unwrap();
        let second = vault.create_recovery_key(&alice).unwrap();
        assert_eq!(first.algorithm, KeyAlgorithm::Aes);

        let wallet_id = vault.recovery_policy.recovery_wallet.clone().unwrap();
        let wallet = Wallet::load(&alice, &wallet_id).unwrap();
        assert_eq!(wallet.name, "recovery");
        assert_eq!(wallet.keys.len(), 2);
        assert_eq!(vault.wallets.len(), 1);
        assert!(host.crypto.holds(&first.id) && host.crypto.holds(&second.id));
    }

    #[test]
    fn test_recovery_key_requires_admin() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        vault
            .create_profile(&host.invocation("bob"), "bob", VaultRole::User, None)
            .unwrap();
        assert!(matches!(
            vault.create_recovery_key(&host.invocation("bob")),
            Err(VaultError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_recovery_custodians() {
        let host = TestHost::new();
        let (mut vault, alice_code) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");

        assert!(matches!(
            vault.add_recovery_custodian(&alice, "bob"),
            Err(VaultError::NotFound(_))
        ));
        vault.create_profile(&bob, "bob", VaultRole::User, None).unwrap();
        let bob_code = vault.add_recovery_custodian(&alice, "bob").unwrap();

        assert!(vault.verify_recovery_code(&bob, "bob", &bob_code).unwrap());
        assert!(vault.verify_recovery_code(&alice, "bob", &bob_code).unwrap());
        assert!(!vault.verify_recovery_code(&alice, "alice", &bob_code).unwrap());
        assert!(vault.verify_recovery_code(&alice, "alice", &alice_code).unwrap());
        assert!(matches!(
            vault.verify_recovery_code(&bob, "alice", &alice_code),
            Err(VaultError::Unauthorized(_))
        ));

        vault.remove_recovery_custodian(&alice, "bob").unwrap();
        assert!(!vault.verify_recovery_code(&bob, "bob", &bob_code).unwrap());
    }

    #[test]
    fn test_partial_reset() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let keep = vault.create_wallet(&alice, "keep").unwrap();
        let drop = vault.create_wallet(&alice, "drop").unwrap();

        vault
            .reset(&alice, &[drop.id.clone(), "unknown".to_string()])
            .unwrap();
        assert_eq!(vault.list_wallets(&alice, None).unwrap(), vec![keep.info()]);
        assert!(Wallet::try_load(&alice, &drop.id).unwrap().is_none());
    }

    #[test]
    fn test_full_reset_keeps_only_caller() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let bob = host.invocation("bob");
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        let key = vault.create_key(&alice, &wallet.id, "k", "AES").unwrap();
        vault
            .register_access_request(&bob, &wallet.id, "bob", WalletRole::ExternalUser)
            .unwrap();
        vault
            .register_wallet_creation_request(&host.invocation("carol"), "C", "carol", WalletRole::Admin)
            .unwrap();
        vault.create_recovery_key(&alice).unwrap();

        assert!(matches!(
            vault.reset(&bob, &[]),
            Err(VaultError::Unauthorized(_))
        ));
        vault.reset(&alice, &[]).unwrap();
        vault.save(&alice).unwrap();

        assert!(vault.wallets.is_empty());
        assert!(vault.access_requests.is_empty());
        assert!(vault.creation_requests.is_empty());
        assert_eq!(vault.users.get_all(alice.ledger()).unwrap(), vec!["alice"]);
        assert!(vault.recovery_policy.recovery_wallet.is_none());
        assert!(!host.crypto.holds(&key.id));
        assert_eq!(host.crypto.live_keys(), 0);
        assert!(!VaultUser::exists(&alice, "bob").unwrap());
        assert!(VaultUser::load(&alice, "alice").unwrap().memberships.is_empty());
        // vault row, alice's row and one users-chain node (three fields, one set)
        assert_eq!(host.ledger.len(), 3);
    }

    #[test]
    fn test_key_failure_keeps_wallet_consistent() {
        let host = TestHost::new();
        let (mut vault, _) = bootstrap(&host);
        let alice = host.invocation("alice");
        let wallet = vault.create_wallet(&alice, "W").unwrap();
        host.crypto.fail(Fault::Generate);

        assert!(matches!(
            vault.create_key(&alice, &wallet.id, "k", "ECDSA"),
            Err(VaultError::ProviderFailure(_))
        ));
        assert!(Wallet::load(&alice, &wallet.id).unwrap().keys.is_empty());
    }

    #[test]
    fn test_vault_document_shape() {
        let host = TestHost::new();
        let (vault, _) = bootstrap(&host);
        let raw = serde_json::to_string(&vault).unwrap();
        for field in [
            "\"name\"",
            "\"wallets\"",
            "\"users\"",
            "\"accessRequests\"",
            "\"creationRequests\"",
            "\"recoveryPolicy\"",
            "\"backupKey\"",
            "\"multiCustody\"",
        ] {
            assert!(raw.contains(field), "missing {field}");
        }
        let back: Vault = serde_json::from_str(&raw).unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), raw);
    }
}
