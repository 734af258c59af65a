// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cryptographic provider abstraction and an in-process software provider.
//!
//! Providers own key material and address it by the key's id. Nothing the
//! provider holds is ever written to the ledger.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use dashmap::{mapref::entry::Entry, DashMap};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// AES-256 key size in bytes.
pub const AES_KEY_SIZE: usize = 32;
/// 12-byte nonce for AES-GCM.
pub const NONCE_SIZE: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("unknown key handle: {0}")]
    UnknownHandle(String),

    #[error("key handle already in use: {0}")]
    HandleInUse(String),

    /// The handle exists but holds material of another kind.
    #[error("key {handle} cannot {operation}")]
    Unsupported {
        handle: String,
        operation: &'static str,
    },

    #[error("invalid key material: {0}")]
    InvalidMaterial(String),

    #[error("cryptographic operation failed: {0}")]
    Operation(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Host-side key custody.
///
/// Every key-bearing call is addressed by the key id the vault minted, so a
/// provider can be backed by an HSM, a KMS or process memory alike.
pub trait CryptoProvider: Send + Sync {
    /// Cryptographically secure random bytes.
    fn random_bytes(&self, len: usize) -> ProviderResult<Vec<u8>>;

    fn generate_asymmetric_key(&self, id: &str) -> ProviderResult<()>;

    fn generate_symmetric_key(&self, id: &str) -> ProviderResult<()>;

    /// Register a SEC1-encoded public key for verification under `id`.
    fn import_verifying_key(&self, id: &str, public_key: &[u8]) -> ProviderResult<()>;

    fn sign(&self, id: &str, payload: &[u8]) -> ProviderResult<Vec<u8>>;

    /// Returns `Ok(false)` for a well-formed key and a bad signature.
    fn verify(&self, id: &str, payload: &[u8], signature: &[u8]) -> ProviderResult<bool>;

    fn symmetric_encrypt(&self, id: &str, plaintext: &[u8]) -> ProviderResult<Vec<u8>>;

    fn symmetric_decrypt(&self, id: &str, ciphertext: &[u8]) -> ProviderResult<Vec<u8>>;

    /// Destroy the material behind `id`.
    fn delete_key(&self, id: &str) -> ProviderResult<()>;
}

enum KeyMaterial {
    Signing(SigningKey),
    Verifying(VerifyingKey),
    Symmetric(Zeroizing<[u8; AES_KEY_SIZE]>),
}

impl KeyMaterial {
    fn kind(&self) -> &'static str {
        match self {
            Self::Signing(_) => "signing",
            Self::Verifying(_) => "verifying",
            Self::Symmetric(_) => "symmetric",
        }
    }
}

/// In-process provider: P-256 ECDSA and AES-256-GCM keys held in memory.
///
/// Ciphertexts are `nonce || aead_output`. Signatures are the fixed-size
/// 64-byte `r || s` encoding.
#[derive(Default)]
pub struct SoftwareProvider {
    keys: DashMap<String, KeyMaterial>,
}

impl SoftwareProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// SEC1 public key of an asymmetric handle, for sharing with verifiers.
    pub fn public_key(&self, id: &str) -> ProviderResult<Vec<u8>> {
        let entry = self
            .keys
            .get(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        match entry.value() {
            KeyMaterial::Signing(key) => {
                Ok(key.verifying_key().to_encoded_point(false).as_bytes().to_vec())
            },
            KeyMaterial::Verifying(key) => Ok(key.to_encoded_point(false).as_bytes().to_vec()),
            KeyMaterial::Symmetric(_) => Err(ProviderError::Unsupported {
                handle: id.to_string(),
                operation: "export a public key",
            }),
        }
    }

    fn insert_new(&self, id: &str, material: KeyMaterial) -> ProviderResult<()> {
        match self.keys.entry(id.to_string()) {
            Entry::Occupied(_) => Err(ProviderError::HandleInUse(id.to_string())),
            Entry::Vacant(slot) => {
                trace!(kind = material.kind(), "provider key generated");
                slot.insert(material);
                Ok(())
            },
        }
    }

    fn unsupported(id: &str, operation: &'static str) -> ProviderError {
        ProviderError::Unsupported {
            handle: id.to_string(),
            operation,
        }
    }

    fn cipher(key: &[u8; AES_KEY_SIZE]) -> ProviderResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key)
            .map_err(|e| ProviderError::InvalidMaterial(format!("invalid key: {e}")))
    }
}

impl CryptoProvider for SoftwareProvider {
    fn random_bytes(&self, len: usize) -> ProviderResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| ProviderError::Operation(format!("entropy source: {e}")))?;
        Ok(buf)
    }

    fn generate_asymmetric_key(&self, id: &str) -> ProviderResult<()> {
        self.insert_new(id, KeyMaterial::Signing(SigningKey::random(&mut OsRng)))
    }

    fn generate_symmetric_key(&self, id: &str) -> ProviderResult<()> {
        let mut bytes = Zeroizing::new([0u8; AES_KEY_SIZE]);
        OsRng
            .try_fill_bytes(&mut *bytes)
            .map_err(|e| ProviderError::Operation(format!("entropy source: {e}")))?;
        self.insert_new(id, KeyMaterial::Symmetric(bytes))
    }

    fn import_verifying_key(&self, id: &str, public_key: &[u8]) -> ProviderResult<()> {
        let key = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|e| ProviderError::InvalidMaterial(format!("public key: {e}")))?;
        match self.keys.entry(id.to_string()) {
            Entry::Occupied(mut slot) => {
                if !matches!(slot.get(), KeyMaterial::Verifying(_)) {
                    return Err(ProviderError::HandleInUse(id.to_string()));
                }
                slot.insert(KeyMaterial::Verifying(key));
            },
            Entry::Vacant(slot) => {
                slot.insert(KeyMaterial::Verifying(key));
            },
        }
        Ok(())
    }

    fn sign(&self, id: &str, payload: &[u8]) -> ProviderResult<Vec<u8>> {
        let entry = self
            .keys
            .get(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        match entry.value() {
            KeyMaterial::Signing(key) => {
                let signature: Signature = key.sign(payload);
                Ok(signature.to_bytes().to_vec())
            },
            _ => Err(Self::unsupported(id, "sign")),
        }
    }

    fn verify(&self, id: &str, payload: &[u8], signature: &[u8]) -> ProviderResult<bool> {
        let entry = self
            .keys
            .get(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        let key: &VerifyingKey = match entry.value() {
            KeyMaterial::Signing(key) => key.verifying_key(),
            KeyMaterial::Verifying(key) => key,
            KeyMaterial::Symmetric(_) => return Err(Self::unsupported(id, "verify")),
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(key.verify(payload, &signature).is_ok())
    }

    fn symmetric_encrypt(&self, id: &str, plaintext: &[u8]) -> ProviderResult<Vec<u8>> {
        let entry = self
            .keys
            .get(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        let KeyMaterial::Symmetric(key) = entry.value() else {
            return Err(Self::unsupported(id, "encrypt"));
        };
        let cipher = Self::cipher(key)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| ProviderError::Operation(format!("encryption failed: {e}")))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn symmetric_decrypt(&self, id: &str, ciphertext: &[u8]) -> ProviderResult<Vec<u8>> {
        let entry = self
            .keys
            .get(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        let KeyMaterial::Symmetric(key) = entry.value() else {
            return Err(Self::unsupported(id, "decrypt"));
        };
        if ciphertext.len() < NONCE_SIZE {
            return Err(ProviderError::Operation(format!(
                "ciphertext too short: expected at least {NONCE_SIZE} bytes, got {}",
                ciphertext.len()
            )));
        }
        let cipher = Self::cipher(key)?;
        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_SIZE);

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|e| ProviderError::Operation(format!("decryption failed: {e}")))
    }

    fn delete_key(&self, id: &str) -> ProviderResult<()> {
        // SigningKey and Zeroizing wipe their bytes on drop.
        let (_, material) = self
            .keys
            .remove(id)
            .ok_or_else(|| ProviderError::UnknownHandle(id.to_string()))?;
        debug!(kind = material.kind(), "provider key destroyed");
        Ok(())
    }
}
