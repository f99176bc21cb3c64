use alloy_primitives::U256;
use payflow_checkout::error::{CheckoutError, Failure};
use payflow_checkout::orchestrator::CheckoutMode;
use payflow_checkout::state::{CheckoutState, Prompt, StateKind};
use payflow_checkout_integration::harness::{TestHarness, Toast, DEFAULT_HASH};
use payflow_checkout_integration::{
    fixed_payment, linked_flow, regular_flow, token, IDENTITY, RECIPIENT, REFERENCE_ID, SIGNER,
};
use payflow_common::chain::Network;
use payflow_common::payment::{PaymentStatus, PaymentUpdate, ReferenceId};
use payflow_common::services::WalletError;
use payflow_common::token::UnitsError;
use payflow_common::transaction::{Receipt, TransactionRequest, TxHash};

/// Whole USDC in base units.
fn usdc(whole: u64) -> U256 {
    U256::from(whole * 1_000_000)
}

fn funded(h: &TestHarness) {
    h.wallet.set_balance(Network::BASE, "usdc", usdc(25));
}

/// Confirmed receipt records the hash on the payment exactly once.
#[tokio::test]
async fn confirmed_payment_records_hash_once() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::OPTIMISM, Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    let hash = checkout.submit().await.unwrap();
    assert_eq!(hash, TxHash::new(DEFAULT_HASH));
    assert_eq!(
        checkout.state(),
        CheckoutState::Confirmed {
            hash: hash.clone()
        }
    );
    assert_eq!(
        h.backend.payment_updates(),
        vec![(
            ReferenceId(REFERENCE_ID.into()),
            PaymentUpdate::with_hash(hash.clone())
        )]
    );

    let payment = checkout.payment();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.hash, Some(hash.clone()));
    assert_eq!(
        h.notifier.toasts(),
        vec![
            Toast::Loading(payflow_checkout::notify::NotificationId(1)),
            Toast::Success(payflow_checkout::notify::NotificationId(1), Some(hash)),
        ]
    );
}

/// A smart-account flow pays through the account kit with its owner config.
#[tokio::test]
async fn smart_account_transfer_carries_owners_and_salt() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;
    checkout.submit().await.unwrap();

    assert!(h.wallet.sent().is_empty());
    let transfers = h.wallet.transfers();
    assert_eq!(transfers.len(), 1);
    let transfer = &transfers[0];
    assert_eq!(
        transfer.owners.owners,
        vec![IDENTITY, SIGNER]
    );
    assert_eq!(transfer.owners.threshold, 1);
    assert_eq!(transfer.salt_nonce, "payflow-salt-1");
    assert_eq!(transfer.version, "1.3.0");
    assert_eq!(transfer.network, Network::BASE);
    assert_eq!(
        transfer.call,
        TransactionRequest::token_transfer(&token(Network::BASE, "usdc"), RECIPIENT, usdc(10))
    );
}

/// First successful transaction flips the wallet to deployed, locally and on
/// the backend. A second payment does not repeat the update.
#[tokio::test]
async fn first_payment_marks_wallet_deployed() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;
    checkout.submit().await.unwrap();

    let flow = checkout.flow();
    assert!(flow.wallet_on(Network::BASE).unwrap().deployed);
    let updates = h.backend.wallet_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, "flow-regular");
    assert!(updates[0].1.deployed);
    assert_eq!(updates[0].1.network, Network::BASE);

    let again = h
        .ready_direct(flow, fixed_payment(Network::BASE, "usdc", 1.0))
        .await;
    again.submit().await.unwrap();
    assert_eq!(h.backend.wallet_updates().len(), 1);
}

/// Connected wallets send directly and never touch deployment state.
#[tokio::test]
async fn linked_flow_sends_from_signer() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            linked_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;
    checkout.submit().await.unwrap();

    assert!(h.wallet.transfers().is_empty());
    let sent = h.wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Network::BASE);
    assert!(h.backend.wallet_updates().is_empty());
}

/// Revert without a classified reason: generic failure, one error toast.
#[tokio::test]
async fn unclassified_revert_fails_with_generic_status() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    h.wallet.set_receipt(Receipt::reverted(None));
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(err, CheckoutError::Failed(Failure::Reverted(None))));
    let state = checkout.state();
    assert_eq!(state.kind(), StateKind::Failed);
    assert_eq!(state.failure().unwrap().status(), None);
    assert_eq!(h.notifier.errors(), vec!["Payment failed".to_string()]);
    assert!(h.backend.payment_updates().is_empty());
    assert!(h.backend.wallet_updates().is_empty());
    assert!(!checkout.flow().wallet_on(Network::BASE).unwrap().deployed);
}

#[tokio::test]
async fn classified_revert_sets_status() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    h.wallet
        .set_receipt(Receipt::reverted(Some("insufficient_fees".into())));
    let checkout = h
        .ready_direct(
            linked_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    checkout.submit().await.unwrap_err();
    assert_eq!(
        checkout.state().failure().and_then(|f| f.status()),
        Some("insufficient_fees".to_string())
    );
    assert_eq!(h.notifier.errors(), vec!["Insufficient gas fees".to_string()]);

    checkout.reset().unwrap();
    assert_eq!(checkout.state(), CheckoutState::Idle);
}

#[tokio::test]
async fn sponsorship_failure_from_kit() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    h.wallet
        .fail_send(WalletError::SponsorshipFailed("paymaster out of funds".into()));
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    checkout.submit().await.unwrap_err();
    assert_eq!(
        checkout.state().failure().and_then(|f| f.status()),
        Some("gas_sponsorship_failure:paymaster out of funds".to_string())
    );
}

/// Signer lost between begin and broadcast: nothing is sent and the
/// reconnection prompt is shown.
#[tokio::test]
async fn signer_disconnect_blocks_broadcast() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    let ticket = checkout.begin_submission().unwrap();
    assert_eq!(checkout.state(), CheckoutState::AwaitingSignature);
    h.wallet.disconnect();

    let err = checkout.complete_submission(ticket).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::SignerMismatch {
            connected: None,
            ..
        }
    ));
    assert_eq!(h.wallet.broadcast_count(), 0);
    assert_eq!(checkout.state(), CheckoutState::Ready);
    assert_eq!(
        checkout.view().prompt,
        Some(Prompt::ReconnectSigner {
            expected: SIGNER,
            connected: None,
        })
    );
    assert!(matches!(
        h.notifier.toasts().last(),
        Some(Toast::Dismissed(_))
    ));

    // Still disconnected: the next attempt is refused up front.
    assert!(matches!(
        checkout.begin_submission(),
        Err(CheckoutError::SignerMismatch { .. })
    ));
    assert_eq!(h.notifier.loading_count(), 1);
}

/// Two submits racing on one checkout: exactly one proceeds.
#[tokio::test]
async fn double_submit_is_refused() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    let (first, second) = tokio::join!(checkout.submit(), checkout.submit());
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(CheckoutError::SubmissionInFlight))));
    assert_eq!(h.wallet.broadcast_count(), 1);
    assert_eq!(h.notifier.loading_count(), 1);
    assert_eq!(h.backend.payment_updates().len(), 1);
}

/// Two checkouts of the same payment share the in-flight registry.
#[tokio::test]
async fn shared_registry_blocks_second_checkout() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let payment = fixed_payment(Network::BASE, "usdc", 10.0);
    let first = h
        .ready_direct(regular_flow(&[Network::BASE]), payment.clone())
        .await;
    let second = h
        .ready_direct(linked_flow(&[Network::BASE]), payment)
        .await;

    let ticket = first.begin_submission().unwrap();
    assert!(h
        .registry
        .is_in_flight(&ReferenceId(REFERENCE_ID.into())));
    assert!(matches!(
        second.begin_submission(),
        Err(CheckoutError::SubmissionInFlight)
    ));
    assert!(matches!(
        second.cancel_payment().await,
        Err(CheckoutError::SubmissionInFlight)
    ));
    assert_eq!(second.state(), CheckoutState::Ready);

    first.complete_submission(ticket).await.unwrap();
    assert!(h.registry.is_empty());
    assert!(second.begin_submission().is_ok());
}

/// User rejection returns to Ready silently and can be retried.
#[tokio::test]
async fn rejection_returns_to_ready() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    h.wallet.fail_send(WalletError::Rejected);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    assert!(matches!(
        checkout.submit().await,
        Err(CheckoutError::SignatureRejected)
    ));
    assert_eq!(checkout.state(), CheckoutState::Ready);
    assert!(h.notifier.errors().is_empty());
    assert!(h.registry.is_empty());

    h.wallet.allow_send();
    checkout.submit().await.unwrap();
    assert_eq!(checkout.state().kind(), StateKind::Confirmed);
    assert_eq!(h.notifier.loading_count(), 2);
}

/// Wrong active network: prompt, switch, then submit.
#[tokio::test]
async fn network_switch_prompt_then_submit() {
    let h = TestHarness::new(Network::OPTIMISM);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::OPTIMISM, Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    assert!(matches!(
        checkout.begin_submission(),
        Err(CheckoutError::NetworkSwitchRequired(Network::BASE))
    ));
    assert_eq!(
        checkout.view().prompt,
        Some(Prompt::SwitchNetwork {
            from: Some(Network::OPTIMISM),
            to: Network::BASE,
        })
    );
    assert_eq!(checkout.state(), CheckoutState::Ready);

    checkout.switch_network().await.unwrap();
    assert_eq!(checkout.view().prompt, None);
    assert_eq!(h.wallet.switches(), vec![Network::BASE]);
    checkout.submit().await.unwrap();
}

#[tokio::test]
async fn failed_switch_is_retryable() {
    let h = TestHarness::new(Network::OPTIMISM);
    funded(&h);
    h.wallet
        .fail_switch(WalletError::SwitchFailed("chain not added".into()));
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    assert!(checkout.switch_network().await.is_err());
    assert!(matches!(
        checkout.view().prompt,
        Some(Prompt::SwitchFailed {
            to: Network::BASE,
            ..
        })
    ));
    assert_eq!(checkout.state(), CheckoutState::Ready);
}

/// Zero or short balance means there is nothing to pay with.
#[tokio::test]
async fn insufficient_balance_is_no_route() {
    for balance in [U256::ZERO, usdc(5)] {
        let h = TestHarness::new(Network::BASE);
        h.wallet.set_balance(Network::BASE, "usdc", balance);
        let checkout = h.checkout(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
            CheckoutMode::Direct,
        );
        checkout.refresh_selection().unwrap();

        assert!(matches!(
            checkout.estimate().await,
            Err(CheckoutError::RouteUnavailable)
        ));
        assert_eq!(checkout.state(), CheckoutState::Failed(Failure::NoRoute));
        assert_eq!(
            checkout.state().failure().and_then(|f| f.status()),
            Some("no_route".to_string())
        );
        assert!(matches!(
            checkout.begin_submission(),
            Err(CheckoutError::InvalidTransition { .. })
        ));
    }
}

/// Backend bookkeeping failure does not undo the on-chain outcome.
#[tokio::test]
async fn backend_failure_after_confirmation_is_tolerated() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;
    h.backend.set_failing(true);

    let hash = checkout.submit().await.unwrap();
    assert_eq!(checkout.state(), CheckoutState::Confirmed { hash });
    assert!(h.backend.payment_updates().is_empty());
    assert!(h.notifier.errors().is_empty());
}

/// Results arriving after detach are dropped without backend calls.
#[tokio::test]
async fn detached_checkout_drops_result() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 10.0),
        )
        .await;

    let ticket = checkout.begin_submission().unwrap();
    checkout.detach();
    assert!(matches!(
        checkout.complete_submission(ticket).await,
        Err(CheckoutError::Detached)
    ));
    assert!(h.backend.payment_updates().is_empty());
    assert!(h.backend.wallet_updates().is_empty());
    assert!(matches!(
        h.notifier.toasts().as_slice(),
        [Toast::Loading(_), Toast::Dismissed(_)]
    ));
    assert!(h.registry.is_empty());
}

/// Changing the amount while a balance check is pending discards its result.
#[tokio::test]
async fn selection_change_supersedes_estimate() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h.checkout(
        regular_flow(&[Network::BASE]),
        fixed_payment(Network::BASE, "usdc", 10.0),
        CheckoutMode::Direct,
    );
    checkout.refresh_selection().unwrap();

    let (estimate, amount) = tokio::join!(checkout.estimate(), async {
        checkout.set_amount("5")
    });
    assert_eq!(amount.unwrap(), usdc(5));
    assert!(matches!(estimate, Err(CheckoutError::Superseded)));
    assert_eq!(checkout.state(), CheckoutState::Idle);

    checkout.estimate().await.unwrap();
    checkout.submit().await.unwrap();
    let transfer = &h.wallet.transfers()[0];
    assert_eq!(
        transfer.call,
        TransactionRequest::token_transfer(&token(Network::BASE, "usdc"), RECIPIENT, usdc(5))
    );
}

/// A float token amount from the backend is rounded to the token's precision
/// instead of failing the estimate.
#[tokio::test]
async fn float_token_amount_is_rounded() {
    let h = TestHarness::new(Network::BASE);
    funded(&h);
    let checkout = h
        .ready_direct(
            regular_flow(&[Network::BASE]),
            fixed_payment(Network::BASE, "usdc", 0.1 + 0.2),
        )
        .await;
    assert_eq!(checkout.state().kind(), StateKind::Ready);

    checkout.submit().await.unwrap();
    let transfer = &h.wallet.transfers()[0];
    assert_eq!(
        transfer.call,
        TransactionRequest::token_transfer(
            &token(Network::BASE, "usdc"),
            RECIPIENT,
            U256::from(300_000u64)
        )
    );
}

/// A typed amount finer than the token's decimals is refused.
#[tokio::test]
async fn typed_amount_beyond_decimals_is_rejected() {
    let h = TestHarness::new(Network::BASE);
    let checkout = h.checkout(
        regular_flow(&[Network::BASE]),
        fixed_payment(Network::BASE, "usdc", 10.0),
        CheckoutMode::Direct,
    );
    checkout.refresh_selection().unwrap();
    assert!(matches!(
        checkout.set_amount("1.0000001"),
        Err(CheckoutError::Amount(UnitsError::Precision { decimals: 6 }))
    ));
    assert_eq!(checkout.view().selection.amount, None);
}

#[tokio::test]
async fn cancel_marks_payment_cancelled() {
    let h = TestHarness::new(Network::BASE);
    let checkout = h.checkout(
        regular_flow(&[Network::BASE]),
        fixed_payment(Network::BASE, "usdc", 10.0),
        CheckoutMode::Direct,
    );
    checkout.cancel_payment().await.unwrap();
    assert_eq!(checkout.payment().status, PaymentStatus::Cancelled);
    assert_eq!(h.backend.cancels(), vec![ReferenceId(REFERENCE_ID.into())]);
}
