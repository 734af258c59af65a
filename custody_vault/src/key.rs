// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key records: capability references to provider-held material.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{context::Invocation, KeyAlgorithm, Result, VaultError};

pub(crate) const KEYS_TABLE: &str = "KeysTable";

/// A custodied key. The record never embeds secret bits; the provider holds
/// them under the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub algorithm: KeyAlgorithm,
    /// Principal that created the key.
    pub owner: String,
}

impl Key {
    /// Mint key material and persist the record.
    ///
    /// The record is written only after the provider confirms generation.
    pub fn create(inv: &Invocation<'_>, description: &str, algorithm: KeyAlgorithm) -> Result<Self> {
        let id = inv.fresh_id()?;
        let generated = match algorithm {
            KeyAlgorithm::Ecdsa => inv.crypto().generate_asymmetric_key(&id),
            KeyAlgorithm::Aes => inv.crypto().generate_symmetric_key(&id),
        };
        if let Err(e) = generated {
            warn!(algorithm = %algorithm, error = %e, "key generation failed");
            return Err(e.into());
        }

        let key = Self {
            id,
            description: description.to_string(),
            algorithm,
            owner: inv.sender().to_string(),
        };
        if let Err(e) = key.save(inv) {
            key.revoke_quietly(inv);
            return Err(e);
        }
        info!(algorithm = %algorithm, owner = %key.owner, "key created");
        Ok(key)
    }

    pub fn load(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        inv.load_json(KEYS_TABLE, id)?
            .ok_or_else(|| VaultError::NotFound(format!("key {id}")))
    }

    pub fn save(&self, inv: &Invocation<'_>) -> Result<()> {
        debug!(algorithm = %self.algorithm, "saving key");
        inv.store_json(KEYS_TABLE, &self.id, self)
    }

    /// Revoke the provider material, then erase the record.
    pub fn delete(inv: &Invocation<'_>, id: &str) -> Result<Self> {
        let key = Self::load(inv, id)?;
        inv.crypto().delete_key(&key.id)?;
        inv.erase(KEYS_TABLE, &key.id)?;
        info!(algorithm = %key.algorithm, "key deleted");
        Ok(key)
    }

    /// Best-effort revocation used when a later step of the same call fails.
    pub(crate) fn revoke_quietly(&self, inv: &Invocation<'_>) {
        if let Err(e) = inv.crypto().delete_key(&self.id) {
            warn!(error = %e, "failed to revoke orphaned key material");
        }
    }

    /// Sign `payload`, returning a base64 signature.
    pub fn sign(&self, inv: &Invocation<'_>, payload: &str) -> Result<String> {
        self.require(KeyAlgorithm::Ecdsa, "sign")?;
        let signature = inv.crypto().sign(&self.id, payload.as_bytes())?;
        Ok(STANDARD.encode(signature))
    }

    /// A signature that is not valid base64 simply does not verify.
    pub fn verify(&self, inv: &Invocation<'_>, payload: &str, signature: &str) -> Result<bool> {
        self.require(KeyAlgorithm::Ecdsa, "verify")?;
        let Ok(raw) = STANDARD.decode(signature) else {
            return Ok(false);
        };
        Ok(inv.crypto().verify(&self.id, payload.as_bytes(), &raw)?)
    }

    /// Encrypt `plaintext`, returning base64 ciphertext.
    pub fn encrypt(&self, inv: &Invocation<'_>, plaintext: &str) -> Result<String> {
        self.require(KeyAlgorithm::Aes, "encrypt")?;
        let ciphertext = inv.crypto().symmetric_encrypt(&self.id, plaintext.as_bytes())?;
        Ok(STANDARD.encode(ciphertext))
    }

    pub fn decrypt(&self, inv: &Invocation<'_>, ciphertext: &str) -> Result<String> {
        self.require(KeyAlgorithm::Aes, "decrypt")?;
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| VaultError::InvalidArgument(format!("ciphertext is not base64: {e}")))?;
        let plaintext = inv.crypto().symmetric_decrypt(&self.id, &raw)?;
        String::from_utf8(plaintext)
            .map_err(|_| VaultError::InvalidArgument("plaintext is not valid UTF-8".to_string()))
    }

    fn require(&self, algorithm: KeyAlgorithm, operation: &str) -> Result<()> {
        if self.algorithm != algorithm {
            return Err(VaultError::WrongKeyType(format!(
                "{} key cannot {operation}; {algorithm} required",
                self.algorithm
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fault, TestHost};

    #[test]
    fn test_create_persists_after_generation() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let key = Key::create(&inv, "signing", KeyAlgorithm::Ecdsa).unwrap();

        assert_eq!(key.owner, "alice");
        assert!(host.crypto.holds(&key.id));
        assert_eq!(Key::load(&inv, &key.id).unwrap(), key);
    }

    #[test]
    fn test_provider_failure_persists_nothing() {
        let host = TestHost::new();
        host.crypto.fail(Fault::Generate);
        let inv = host.invocation("alice");

        assert!(matches!(
            Key::create(&inv, "k", KeyAlgorithm::Aes),
            Err(VaultError::ProviderFailure(_))
        ));
        assert!(host.ledger.is_empty());
        assert_eq!(host.crypto.live_keys(), 0);
    }

    #[test]
    fn test_failed_save_revokes_material() {
        let host = TestHost::new();
        host.ledger.freeze();
        let inv = host.invocation("alice");

        assert!(matches!(
            Key::create(&inv, "k", KeyAlgorithm::Ecdsa),
            Err(VaultError::Ledger(_))
        ));
        assert_eq!(host.crypto.live_keys(), 0);
    }

    #[test]
    fn test_sign_verify() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let key = Key::create(&inv, "k", KeyAlgorithm::Ecdsa).unwrap();

        let signature = key.sign(&inv, "hello").unwrap();
        assert!(key.verify(&inv, "hello", &signature).unwrap());
        assert!(!key.verify(&inv, "tampered", &signature).unwrap());
        assert!(!key.verify(&inv, "hello", "not base64!").unwrap());
    }

    #[test]
    fn test_encrypt_decrypt() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let key = Key::create(&inv, "k", KeyAlgorithm::Aes).unwrap();

        let ciphertext = key.encrypt(&inv, "secret").unwrap();
        assert_ne!(ciphertext, "secret");
        assert_eq!(key.decrypt(&inv, &ciphertext).unwrap(), "secret");
        assert!(matches!(
            key.decrypt(&inv, "***"),
            Err(VaultError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wrong_key_type() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let ecdsa = Key::create(&inv, "e", KeyAlgorithm::Ecdsa).unwrap();
        let aes = Key::create(&inv, "a", KeyAlgorithm::Aes).unwrap();

        assert!(matches!(
            aes.sign(&inv, "x"),
            Err(VaultError::WrongKeyType(_))
        ));
        assert!(matches!(
            aes.verify(&inv, "x", "AAAA"),
            Err(VaultError::WrongKeyType(_))
        ));
        assert!(matches!(
            ecdsa.encrypt(&inv, "x"),
            Err(VaultError::WrongKeyType(_))
        ));
        assert!(matches!(
            ecdsa.decrypt(&inv, "AAAA"),
            Err(VaultError::WrongKeyType(_))
        ));
    }

    #[test]
    fn test_delete_revokes_provider_material() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let key = Key::create(&inv, "k", KeyAlgorithm::Ecdsa).unwrap();

        Key::delete(&inv, &key.id).unwrap();
        assert!(!host.crypto.holds(&key.id));
        assert!(matches!(
            Key::load(&inv, &key.id),
            Err(VaultError::NotFound(_))
        ));
        assert!(matches!(
            key.sign(&inv, "hello"),
            Err(VaultError::ProviderFailure(_))
        ));
    }

    #[test]
    fn test_delete_keeps_record_when_revocation_fails() {
        let host = TestHost::new();
        let inv = host.invocation("alice");
        let key = Key::create(&inv, "k", KeyAlgorithm::Aes).unwrap();
        host.crypto.fail(Fault::Delete);

        assert!(Key::delete(&inv, &key.id).is_err());
        assert!(Key::load(&inv, &key.id).is_ok());
        assert!(host.crypto.holds(&key.id));
    }

    #[test]
    fn test_record_shape() {
        let key = Key {
            id: "k1".to_string(),
            description: "d".to_string(),
            algorithm: KeyAlgorithm::Ecdsa,
            owner: "alice".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            r#"{"id":"k1","description":"d","type":"ECDSA","owner":"alice"}"#
        );
    }
}
