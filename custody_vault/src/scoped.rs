// SPDX-License-Identifier: MIT OR Apache-2.0
//! Caller-scoped view of the custody service.

use crate::context::CallContext;
use crate::key::Key;
use crate::request::{AccessRequest, WalletCreationRequest};
use crate::service::CustodyService;
use crate::user::UserInfo;
use crate::wallet::{MemberInfo, WalletInfo};
use crate::{Result, VaultRole, WalletRole};

/// A view of the service bound to one caller.
///
/// All operations are performed as the scoped caller, removing the need to
/// pass a [`CallContext`] on every call.
pub struct ScopedCustody<'a> {
    service: &'a CustodyService,
    caller: CallContext,
}

impl<'a> ScopedCustody<'a> {
    pub(crate) fn new(service: &'a CustodyService, caller: CallContext) -> Self {
        Self { service, caller }
    }

    pub fn sender(&self) -> &str {
        self.caller.sender()
    }

    pub fn create_vault(&self, name: &str) -> Result<String> {
        self.service.create_vault(&self.caller, name)
    }

    pub fn rename_vault(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.service.rename_vault(&self.caller, old_name, new_name)
    }

    pub fn reset_vault(&self, wallet_ids: &[String]) -> Result<()> {
        self.service.reset_vault(&self.caller, wallet_ids)
    }

    pub fn create_profile(
        &self,
        user_id: &str,
        role: VaultRole,
        public_key: Option<&str>,
    ) -> Result<UserInfo> {
        self.service
            .create_profile(&self.caller, user_id, role, public_key)
    }

    pub fn delete_profile(&self, user_id: &str) -> Result<()> {
        self.service.delete_profile(&self.caller, user_id)
    }

    pub fn list_users(&self) -> Result<Vec<UserInfo>> {
        self.service.list_users(&self.caller)
    }

    pub fn create_wallet(&self, name: &str) -> Result<WalletInfo> {
        self.service.create_wallet(&self.caller, name)
    }

    pub fn delete_wallet(&self, wallet_id: &str) -> Result<()> {
        self.service.delete_wallet(&self.caller, wallet_id)
    }

    pub fn list_wallets(&self, user_id: Option<&str>) -> Result<Vec<WalletInfo>> {
        self.service.list_wallets(&self.caller, user_id)
    }

    pub fn add_user_to_wallet(&self, wallet_id: &str, user_id: &str, role: WalletRole) -> Result<()> {
        self.service
            .add_user_to_wallet(&self.caller, wallet_id, user_id, role)
    }

    pub fn remove_user_from_wallet(&self, wallet_id: &str, user_id: &str) -> Result<()> {
        self.service
            .remove_user_from_wallet(&self.caller, wallet_id, user_id)
    }

    pub fn list_wallet_users(&self, wallet_id: &str) -> Result<Vec<MemberInfo>> {
        self.service.list_wallet_users(&self.caller, wallet_id)
    }

    pub fn rename_wallet(&self, wallet_id: &str, old_name: &str, new_name: &str) -> Result<()> {
        self.service
            .rename_wallet(&self.caller, wallet_id, old_name, new_name)
    }

    pub fn reset_wallet(&self, wallet_id: &str, key_ids: &[String]) -> Result<()> {
        self.service.reset_wallet(&self.caller, wallet_id, key_ids)
    }

    pub fn create_key(&self, wallet_id: &str, description: &str, algorithm: &str) -> Result<Key> {
        self.service
            .create_key(&self.caller, wallet_id, description, algorithm)
    }

    pub fn delete_key(&self, wallet_id: &str, key_id: &str) -> Result<()> {
        self.service.delete_key(&self.caller, wallet_id, key_id)
    }

    pub fn list_keys(&self, wallet_id: &str) -> Result<Vec<Key>> {
        self.service.list_keys(&self.caller, wallet_id)
    }

    pub fn sign(&self, wallet_id: &str, key_id: &str, payload: &str) -> Result<String> {
        self.service.sign(&self.caller, wallet_id, key_id, payload)
    }

    pub fn verify(&self, wallet_id: &str, key_id: &str, payload: &str, signature: &str) -> Result<bool> {
        self.service
            .verify(&self.caller, wallet_id, key_id, payload, signature)
    }

    pub fn encrypt(&self, wallet_id: &str, key_id: &str, plaintext: &str) -> Result<String> {
        self.service
            .encrypt(&self.caller, wallet_id, key_id, plaintext)
    }

    pub fn decrypt(&self, wallet_id: &str, key_id: &str, ciphertext: &str) -> Result<String> {
        self.service
            .decrypt(&self.caller, wallet_id, key_id, ciphertext)
    }

    pub fn register_access_request(
        &self,
        wallet_id: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<AccessRequest> {
        self.service
            .register_access_request(&self.caller, wallet_id, user_id, role)
    }

    pub fn approve_access_request(&self, request_id: &str) -> Result<()> {
        self.service.approve_access_request(&self.caller, request_id)
    }

    pub fn discard_access_request(&self, request_id: &str) -> Result<()> {
        self.service.discard_access_request(&self.caller, request_id)
    }

    pub fn list_access_requests(&self) -> Result<Vec<AccessRequest>> {
        self.service.list_access_requests(&self.caller)
    }

    pub fn register_wallet_creation_request(
        &self,
        wallet_name: &str,
        user_id: &str,
        role: WalletRole,
    ) -> Result<WalletCreationRequest> {
        self.service
            .register_wallet_creation_request(&self.caller, wallet_name, user_id, role)
    }

    pub fn approve_wallet_creation_request(&self, request_id: &str) -> Result<WalletInfo> {
        self.service
            .approve_wallet_creation_request(&self.caller, request_id)
    }

    pub fn discard_wallet_creation_request(&self, request_id: &str) -> Result<()> {
        self.service
            .discard_wallet_creation_request(&self.caller, request_id)
    }

    pub fn list_wallet_creation_requests(&self) -> Result<Vec<WalletCreationRequest>> {
        self.service.list_wallet_creation_requests(&self.caller)
    }

    pub fn create_recovery_key(&self) -> Result<Key> {
        self.service.create_recovery_key(&self.caller)
    }

    pub fn add_recovery_custodian(&self, user_id: &str) -> Result<String> {
        self.service.add_recovery_custodian(&self.caller, user_id)
    }

    pub fn remove_recovery_custodian(&self, user_id: &str) -> Result<()> {
        self.service
            .remove_recovery_custodian(&self.caller, user_id)
    }

    pub fn verify_recovery_code(&self, user_id: &str, code: &str) -> Result<bool> {
        self.service
            .verify_recovery_code(&self.caller, user_id, code)
    }
}
