// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hosts share one service across threads. Overlapping invocations must
//! land one after another, leaving every chain header in step with its
//! nodes.

use std::thread;

use custody_vault::WalletRole;
use integration_tests::{create_service_with_vault, ROOT};

const THREADS: usize = 8;
const PER_THREAD: usize = 25;

#[test]
fn test_parallel_wallet_creation_keeps_chain_intact() {
    let (env, _) = create_service_with_vault();

    thread::scope(|s| {
        for t in 0..THREADS {
            let service = env.service.clone();
            s.spawn(move || {
                let alice = service.scope(ROOT);
                for i in 0..PER_THREAD {
                    alice.create_wallet(&format!("w{t}-{i}")).unwrap();
                }
            });
        }
    });

    let vault = env.service.vault_snapshot().unwrap();
    assert_eq!(vault.wallets.len(), THREADS * PER_THREAD);
    let wallets = env.service.scope(ROOT).list_wallets(None).unwrap();
    assert_eq!(wallets.len(), THREADS * PER_THREAD);
}

#[test]
fn test_parallel_requests_and_approvals() {
    let (env, _) = create_service_with_vault();
    let wallet = env.service.scope(ROOT).create_wallet("W").unwrap();

    thread::scope(|s| {
        for t in 0..THREADS {
            let service = env.service.clone();
            let wallet_id = wallet.id.clone();
            s.spawn(move || {
                let user = format!("user{t}");
                service
                    .scope(&user)
                    .register_access_request(&wallet_id, &user, WalletRole::ExternalUser)
                    .unwrap();
            });
        }
    });

    let alice = env.service.scope(ROOT);
    let requests = alice.list_access_requests().unwrap();
    assert_eq!(requests.len(), THREADS);
    assert_eq!(alice.list_users().unwrap().len(), THREADS + 1);

    thread::scope(|s| {
        for request in &requests {
            let service = env.service.clone();
            s.spawn(move || {
                service
                    .scope(ROOT)
                    .approve_access_request(&request.id)
                    .unwrap();
            });
        }
    });

    assert!(alice.list_access_requests().unwrap().is_empty());
    assert_eq!(
        alice.list_wallet_users(&wallet.id).unwrap().len(),
        THREADS + 1
    );
}
