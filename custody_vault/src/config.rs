// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vault configuration.

use serde::{Deserialize, Serialize};

use crate::{Result, VaultError};

/// Environment variable for the entropy of generated identifiers, in bytes.
pub const ENV_ID_ENTROPY_BYTES: &str = "CUSTODY_ID_ENTROPY_BYTES";
/// Environment variable for the length of recovery codes, in bytes.
pub const ENV_RECOVERY_CODE_BYTES: &str = "CUSTODY_RECOVERY_CODE_BYTES";
/// Environment variable for the length of the vault backup key, in bytes.
pub const ENV_BACKUP_KEY_BYTES: &str = "CUSTODY_BACKUP_KEY_BYTES";
/// Environment variable for the provider handle prefix of imported verifying keys.
pub const ENV_VERIFYING_KEY_PREFIX: &str = "CUSTODY_VERIFYING_KEY_PREFIX";

mod env_parse {
    use super::{Result, VaultError};

    /// Parse a strictly positive usize from an environment variable.
    pub fn parse_nonzero_usize(key: &str) -> Option<Result<usize>> {
        std::env::var(key).ok().map(|val| {
            let parsed: usize = val
                .parse()
                .map_err(|e| VaultError::InvalidArgument(format!("invalid {key}: {e}")))?;
            if parsed == 0 {
                return Err(VaultError::InvalidArgument(format!(
                    "invalid {key}: must be greater than zero"
                )));
            }
            Ok(parsed)
        })
    }

    pub fn parse_string(key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Sizes and naming used when the vault mints identifiers and secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Random bytes behind every generated id (wallets, keys, requests, chain nodes).
    pub id_entropy_bytes: usize,
    pub recovery_code_bytes: usize,
    pub backup_key_bytes: usize,
    /// Provider handle prefix under which profile public keys are imported.
    pub verifying_key_prefix: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            id_entropy_bytes: 64,
            recovery_code_bytes: 20,
            backup_key_bytes: 64,
            verifying_key_prefix: "pkey:".to_string(),
        }
    }
}

impl VaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `CUSTODY_*` environment variables, falling
    /// back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(result) = env_parse::parse_nonzero_usize(ENV_ID_ENTROPY_BYTES) {
            config.id_entropy_bytes = result?;
        }
        if let Some(result) = env_parse::parse_nonzero_usize(ENV_RECOVERY_CODE_BYTES) {
            config.recovery_code_bytes = result?;
        }
        if let Some(result) = env_parse::parse_nonzero_usize(ENV_BACKUP_KEY_BYTES) {
            config.backup_key_bytes = result?;
        }
        if let Some(prefix) = env_parse::parse_string(ENV_VERIFYING_KEY_PREFIX) {
            config.verifying_key_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_id_entropy_bytes(mut self, bytes: usize) -> Self {
        self.id_entropy_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_recovery_code_bytes(mut self, bytes: usize) -> Self {
        self.recovery_code_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_backup_key_bytes(mut self, bytes: usize) -> Self {
        self.backup_key_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_verifying_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.verifying_key_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_entropy_bytes == 0 {
            return Err(VaultError::InvalidArgument(
                "id_entropy_bytes must be greater than zero".to_string(),
            ));
        }
        if self.recovery_code_bytes == 0 {
            return Err(VaultError::InvalidArgument(
                "recovery_code_bytes must be greater than zero".to_string(),
            ));
        }
        if self.backup_key_bytes == 0 {
            return Err(VaultError::InvalidArgument(
                "backup_key_bytes must be greater than zero".to_string(),
            ));
        }
        if self.verifying_key_prefix.is_empty() {
            return Err(VaultError::InvalidArgument(
                "verifying_key_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Provider handle for the verifying key imported with `user_id`'s profile.
    pub fn verifying_key_handle(&self, user_id: &str) -> String {
        format!("{}{user_id}", self.verifying_key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const ALL_VARS: [&str; 4] = [
        ENV_ID_ENTROPY_BYTES,
        ENV_RECOVERY_CODE_BYTES,
        ENV_BACKUP_KEY_BYTES,
        ENV_VERIFYING_KEY_PREFIX,
    ];

    fn with_env_vars<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let result = f();
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.id_entropy_bytes, 64);
        assert_eq!(config.recovery_code_bytes, 20);
        assert_eq!(config.backup_key_bytes, 64);
        assert_eq!(config.verifying_key_prefix, "pkey:");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = VaultConfig::new()
            .with_id_entropy_bytes(16)
            .with_recovery_code_bytes(8)
            .with_backup_key_bytes(32)
            .with_verifying_key_prefix("pub/");
        assert_eq!(config.id_entropy_bytes, 16);
        assert_eq!(config.recovery_code_bytes, 8);
        assert_eq!(config.backup_key_bytes, 32);
        assert_eq!(config.verifying_key_handle("alice"), "pub/alice");
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(VaultConfig::new().with_id_entropy_bytes(0).validate().is_err());
        assert!(VaultConfig::new()
            .with_recovery_code_bytes(0)
            .validate()
            .is_err());
        assert!(VaultConfig::new().with_backup_key_bytes(0).validate().is_err());
        assert!(VaultConfig::new()
            .with_verifying_key_prefix("")
            .validate()
            .is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        with_env_vars(&[], || {
            assert_eq!(VaultConfig::from_env().unwrap(), VaultConfig::default());
        });
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        with_env_vars(
            &[
                (ENV_ID_ENTROPY_BYTES, "24"),
                (ENV_RECOVERY_CODE_BYTES, "10"),
                (ENV_BACKUP_KEY_BYTES, "48"),
                (ENV_VERIFYING_KEY_PREFIX, "verify:"),
            ],
            || {
                let config = VaultConfig::from_env().unwrap();
                assert_eq!(config.id_entropy_bytes, 24);
                assert_eq!(config.recovery_code_bytes, 10);
                assert_eq!(config.backup_key_bytes, 48);
                assert_eq!(config.verifying_key_prefix, "verify:");
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_number() {
        with_env_vars(&[(ENV_ID_ENTROPY_BYTES, "lots")], || {
            let err = VaultConfig::from_env().unwrap_err();
            assert!(err.to_string().contains(ENV_ID_ENTROPY_BYTES));
        });
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero() {
        with_env_vars(&[(ENV_RECOVERY_CODE_BYTES, "0")], || {
            assert!(matches!(
                VaultConfig::from_env(),
                Err(VaultError::InvalidArgument(_))
            ));
        });
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_empty_prefix() {
        with_env_vars(&[(ENV_VERIFYING_KEY_PREFIX, "")], || {
            assert!(VaultConfig::from_env().is_err());
        });
    }
}
