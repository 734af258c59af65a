// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration test helpers for the custody vault.
//!
//! Provides a service wired to an in-memory ledger and a fault-injecting
//! provider, with handles kept so tests can inspect or sabotage either side.

use std::sync::{Arc, Once};

use custody_vault::testing::FaultyProvider;
use custody_vault::{CallContext, CustodyService, VaultConfig};
use ledger_store::MemoryLedger;
use tracing_subscriber::EnvFilter;

/// Name of the vault created by [`create_service_with_vault`].
pub const VAULT_NAME: &str = "V";

/// Principal that creates the vault and is its first admin.
pub const ROOT: &str = "alice";

/// A service plus direct handles to its backing ledger and provider.
pub struct TestEnv {
    pub ledger: Arc<MemoryLedger>,
    pub crypto: Arc<FaultyProvider>,
    pub service: CustodyService,
}

impl TestEnv {
    pub fn caller(&self, sender: &str) -> CallContext {
        CallContext::new(sender)
    }
}

/// Install a log subscriber once per test binary, filtered by `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Create a service with no vault yet.
pub fn create_service() -> TestEnv {
    init_tracing();
    let ledger = Arc::new(MemoryLedger::new());
    let crypto = Arc::new(FaultyProvider::new());
    let service = CustodyService::new(
        ledger.clone(),
        crypto.clone(),
        VaultConfig::default().with_id_entropy_bytes(16),
    );
    TestEnv {
        ledger,
        crypto,
        service,
    }
}

/// Create a service whose vault was created by [`ROOT`].
///
/// Returns the environment and ROOT's recovery code.
pub fn create_service_with_vault() -> (TestEnv, String) {
    let env = create_service();
    let code = env
        .service
        .create_vault(&CallContext::new(ROOT), VAULT_NAME)
        .expect("vault creation failed");
    (env, code)
}
