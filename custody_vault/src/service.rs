// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transactional facade over the vault.
//!
//! Every public method runs as one invocation: a [`LedgerTransaction`] is
//! opened over the backing ledger, the vault is loaded, the operation runs,
//! touched aggregates are saved, and the buffered writes are committed in a
//! single batch. Any error drops the transaction, so nothing is persisted.
//!
//! Invocations are serialized: one holds the service's invocation lock from
//! `begin` to `commit`, so no two transactions read the same chain header.
//! Clones share that lock. Services built separately over one ledger do not.
//!
//! Provider side effects cannot be rolled back. When saving or committing
//! fails after key material was generated, the material is revoked before
//! the error is returned.

use std::sync::Arc;

use ledger_store::{LedgerStore, LedgerTransaction};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    config::VaultConfig,
    context::{CallContext, Invocation},
    key::Key,
    provider::CryptoProvider,
    request::{AccessRequest, WalletCreationRequest},
    scoped::ScopedCustody,
    user::{UserInfo, VaultUser},
    vault::Vault,
    wallet::{MemberInfo, Wallet, WalletInfo},
    Result, VaultRole, WalletRole,
};

/// Shared entry point for hosts. Cheap to clone; clones serialize their
/// invocations against each other.
#[derive(Clone)]
pub struct CustodyService {
    ledger: Arc<dyn LedgerStore>,
    crypto: Arc<dyn CryptoProvider>,
    config: VaultConfig,
    invocations: Arc<Mutex<()>>,
}

impl CustodyService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        crypto: Arc<dyn CryptoProvider>,
        config: VaultConfig,
    ) -> Self {
        Self {
            ledger,
            crypto,
            config,
            invocations: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// View performing every operation as `sender`.
    pub fn scope(&self, sender: &str) -> ScopedCustody<'_> {
        ScopedCustody::new(self, CallContext::new(sender))
    }

    // ---------- Invocation plumbing ----------

    fn execute<T, F>(&self, caller: &CallContext, op: F) -> Result<T>
    where
        F: FnOnce(&Invocation<'_>) -> Result<T>,
    {
        self.execute_with_abort(caller, op, |_| {})
    }

    fn execute_with_abort<T, F, A>(&self, caller: &CallContext, op: F, on_abort: A) -> Result<T>
    where
        F: FnOnce(&Invocation<'_>) -> Result<T>,
        A: FnOnce(&T),
    {
        let _serial = self.invocations.lock();
        let tx = LedgerTransaction::begin(self.ledger.as_ref());
        let value = {
            let inv = Invocation::new(&tx, self.crypto.as_ref(), &self.config, caller.clone());
            op(&inv)?
        };
        match tx.commit() {
            Ok(writes) => {
                debug!(sender = %caller.sender(), writes, "invocation committed");
                Ok(value)
            },
            Err(e) => {
                warn!(sender = %caller.sender(), error = %e, "invocation commit failed");
                on_abort(&value);
                Err(e.into())
            },
        }
    }

    fn read_vault<T, F>(&self, caller: &CallContext, op: F) -> Result<T>
    where
        F: FnOnce(&Vault, &Invocation<'_>) -> Result<T>,
    {
        self.execute(caller, |inv| {
            let vault = Vault::load(inv)?;
            op(&vault, inv)
        })
    }

    fn with_vault<T, F>(&self, caller: &CallContext, op: F) -> Result<T>
    where
        F: FnOnce(&mut Vault, &Invocation<'_>) -> Result<T>,
    {
        self.with_vault_or_abort(caller, op, |_| {})
    }

    fn with_vault_or_abort<T, F, A>(&self, caller: &CallContext, op: F, on_abort: A) -> Result<T>
    where
        F: FnOnce(&mut Vault, &Invocation<'_>) -> Result<T>,
        A: Fn(&T),
    {
        self.execute_with_abort(
            caller,
            |inv| {
                let mut vault = Vault::load(inv)?;
                let value = op(&mut vault, inv)?;
                if let Err(e) = vault.save(inv) {
                    on_abort(&value);
                    return Err(e);
                }
                Ok(value)
            },
            &on_abort,
        )
    }

    fn revoke(&self, handle: &str) {
        if let Err(e) = self.crypto.delete_key(handle) {
            warn!(error = %e, "failed to revoke key material after aborted invocation");
        }
    }

    // ---------- Host inspection ----------

    /// Current vault header, read without an authorization check.
    pub fn vault_snapshot(&self) -> Result<Vault> {
        let inv = self.inspector();
        Vault::load(&inv)
    }

    /// Current wallet record, read without an authorization check.
    pub fn wallet_snapshot(&self, wallet_id: &str) -> Result<Wallet> {
        let inv = self.inspector();
        Wallet::load(&inv, wallet_id)
    }

    /// Current profile, read without an authorization check.
    pub fn profile_snapshot(&self, user_id: &str) -> Result<VaultUser> {
        let inv = self.inspector();
        VaultUser::load(&inv, user_id)
    }

    fn inspector(&self) -> Invocation<'_> {
        Invocation::new(
            self.ledger.as_ref(),
            self.crypto.as_ref(),
            &self.config,
            CallContext::new(""),
        )
    }

    // ---------- Vault ----------

    /// Create the vault with `caller` as admin. Returns the caller's
    /// one-time recovery code.
    pub fn create_vault(&self, caller: &CallContext, name: &str) -> Result<String> {
        self.execute(caller, |inv| Vault::create(inv, name).map(|(_, code)| code))
    }

    pub fn rename_vault(&self, caller: &CallContext, old_name: &str, new_name: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.rename(inv, old_name, new_name))
    }

    pub fn reset_vault(&self, caller: &CallContext, wallet_ids: &[String]) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.reset(inv, wallet_ids))
    }

    // ---------- Profiles ----------

    pub fn create_profile(
        &self,
        caller: &CallContext,
        user_id: &str,
        role: VaultRole,
        public_key: Option<&str>,
    ) -> Result<UserInfo> {
        self.with_vault_or_abort(
            caller,
            |vault, inv| {
                vault
                    .create_profile(inv, user_id, role, public_key)
                    .map(|user| user.info())
            },
            |_| {
                if public_key.is_some() {
                    self.revoke(&self.config.verifying_key_handle(user_id));
                }
            },
        )
    }

    pub fn delete_profile(&self, caller: &CallContext, user_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.delete_profile(inv, user_id))
    }

    pub fn list_users(&self, caller: &CallContext) -> Result<Vec<UserInfo>> {
        self.read_vault(caller, |vault, inv| vault.list_users(inv))
    }

    // ---------- Wallets ----------

    pub fn create_wallet(&self, caller: &CallContext, name: &str) -> Result<WalletInfo> {
        self.with_vault(caller, |vault, inv| {
            vault.create_wallet(inv, name).map(|wallet| wallet.info())
        })
    }

    pub fn delete_wallet(&self, caller: &CallContext, wallet_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.delete_wallet(inv, wallet_id))
    }

    pub fn list_wallets(&self, caller: &CallContext, user_id: Option<&str>) -> Result<Vec<WalletInfo>> {
        self.read_vault(caller, |vault, inv| vault.list_wallets(inv, user_id))
    }

    pub fn add_user_to_wallet(
        &self,
        caller: &CallContext,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<()> {
        self.read_vault(caller, |vault, inv| {
            vault.add_user_to_wallet(inv, wallet_id, user_id, role)
        })
    }

    pub fn remove_user_from_wallet(&self, caller: &CallContext, wallet_id: &str, user_id: &str) -> Result<()> {
        self.read_vault(caller, |vault, inv| {
            vault.remove_user_from_wallet(inv, wallet_id, user_id)
        })
    }

    pub fn list_wallet_users(&self, caller: &CallContext, wallet_id: &str) -> Result<Vec<MemberInfo>> {
        self.read_vault(caller, |vault, inv| vault.list_wallet_users(inv, wallet_id))
    }

    pub fn rename_wallet(
        &self,
        caller: &CallContext,
        wallet_id: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        self.read_vault(caller, |vault, inv| {
            vault.rename_wallet(inv, wallet_id, old_name, new_name)
        })
    }

    pub fn reset_wallet(&self, caller: &CallContext, wallet_id: &str, key_ids: &[String]) -> Result<()> {
        self.read_vault(caller, |vault, inv| vault.reset_wallet(inv, wallet_id, key_ids))
    }

    // ---------- Keys ----------

    pub fn create_key(
        &self,
        caller: &CallContext,
        wallet_id: &str,
        description: &str,
        algorithm: &str,
    ) -> Result<Key> {
        self.execute_with_abort(
            caller,
            |inv| Vault::load(inv)?.create_key(inv, wallet_id, description, algorithm),
            |key: &Key| self.revoke(&key.id),
        )
    }

    pub fn delete_key(&self, caller: &CallContext, wallet_id: &str, key_id: &str) -> Result<()> {
        self.read_vault(caller, |vault, inv| vault.delete_key(inv, wallet_id, key_id))
    }

    pub fn list_keys(&self, caller: &CallContext, wallet_id: &str) -> Result<Vec<Key>> {
        self.read_vault(caller, |vault, inv| vault.list_keys(inv, wallet_id))
    }

    pub fn sign(&self, caller: &CallContext, wallet_id: &str, key_id: &str, payload: &str) -> Result<String> {
        self.read_vault(caller, |vault, inv| vault.sign(inv, wallet_id, key_id, payload))
    }

    pub fn verify(
        &self,
        caller: &CallContext,
        wallet_id: &str,
        key_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<bool> {
        self.read_vault(caller, |vault, inv| {
            vault.verify(inv, wallet_id, key_id, payload, signature)
        })
    }

    pub fn encrypt(&self, caller: &CallContext, wallet_id: &str, key_id: &str, plaintext: &str) -> Result<String> {
        self.read_vault(caller, |vault, inv| {
            vault.encrypt(inv, wallet_id, key_id, plaintext)
        })
    }

    pub fn decrypt(&self, caller: &CallContext, wallet_id: &str, key_id: &str, ciphertext: &str) -> Result<String> {
        self.read_vault(caller, |vault, inv| {
            vault.decrypt(inv, wallet_id, key_id, ciphertext)
        })
    }

    // ---------- Requests ----------

    pub fn register_access_request(
        &self,
        caller: &CallContext,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<AccessRequest> {
        self.with_vault(caller, |vault, inv| {
            vault.register_access_request(inv, wallet_id, user_id, role)
        })
    }

    pub fn approve_access_request(&self, caller: &CallContext, request_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.approve_access_request(inv, request_id))
    }

    pub fn discard_access_request(&self, caller: &CallContext, request_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| vault.discard_access_request(inv, request_id))
    }

    pub fn list_access_requests(&self, caller: &CallContext) -> Result<Vec<AccessRequest>> {
        self.read_vault(caller, |vault, inv| vault.list_access_requests(inv))
    }

    pub fn register_wallet_creation_request(
        &self,
        caller: &CallContext,
        wallet_name: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<WalletCreationRequest> {
        self.with_vault(caller, |vault, inv| {
            vault.register_wallet_creation_request(inv, wallet_name, user_id, role)
        })
    }

    pub fn approve_wallet_creation_request(&self, caller: &CallContext, request_id: &str) -> Result<WalletInfo> {
        self.with_vault(caller, |vault, inv| {
            vault
                .approve_wallet_creation_request(inv, request_id)
                .map(|wallet| wallet.info())
        })
    }

    pub fn discard_wallet_creation_request(&self, caller: &CallContext, request_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| {
            vault.discard_wallet_creation_request(inv, request_id)
        })
    }

    pub fn list_wallet_creation_requests(&self, caller: &CallContext) -> Result<Vec<WalletCreationRequest>> {
        self.read_vault(caller, |vault, inv| vault.list_wallet_creation_requests(inv))
    }

    // ---------- Recovery ----------

    pub fn create_recovery_key(&self, caller: &CallContext) -> Result<Key> {
        self.with_vault_or_abort(
            caller,
            |vault, inv| vault.create_recovery_key(inv),
            |key: &Key| self.revoke(&key.id),
        )
    }

    pub fn add_recovery_custodian(&self, caller: &CallContext, user_id: &str) -> Result<String> {
        self.with_vault(caller, |vault, inv| vault.add_recovery_custodian(inv, user_id))
    }

    pub fn remove_recovery_custodian(&self, caller: &CallContext, user_id: &str) -> Result<()> {
        self.with_vault(caller, |vault, inv| {
            vault.remove_recovery_custodian(inv, user_id)
        })
    }

    pub fn verify_recovery_code(&self, caller: &CallContext, user_id: &str, code: &str) -> Result<bool> {
        self.read_vault(caller, |vault, inv| {
            vault.verify_recovery_code(inv, user_id, code)
        })
    }
}
