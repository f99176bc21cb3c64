use alloy_primitives::U256;
use payflow_checkout::error::{CheckoutError, Failure};
use payflow_checkout::orchestrator::{CheckoutMode, RoutedTarget};
use payflow_checkout::state::{CheckoutState, Quote, StateKind};
use payflow_checkout_integration::harness::{
    option_for, MockRouting, TestCheckout, TestHarness, DEFAULT_HASH, SPONSORED_HASH,
};
use payflow_checkout_integration::{
    fixed_payment, open_payment, regular_flow, token, wallet_address, RECIPIENT, REFERENCE_ID,
};
use payflow_common::chain::Network;
use payflow_common::payment::{PaymentUpdate, ReferenceId};
use payflow_common::transaction::{TransactionRequest, TxHash};

fn routed_mode() -> CheckoutMode {
    CheckoutMode::Routed {
        target: RoutedTarget {
            network: Network::BASE,
            call: TransactionRequest::native_transfer(RECIPIENT, U256::from(1_000_000u64)),
        },
    }
}

/// Router quotes USDC on Optimism and Arbitrum only.
fn harness(active: Network) -> TestHarness {
    let routing = MockRouting::with_options(vec![
        option_for(&token(Network::OPTIMISM, "usdc"), "10.05"),
        option_for(&token(Network::ARBITRUM, "usdc"), "10.07"),
    ]);
    TestHarness::new(active).with_routing(routing)
}

async fn loaded(h: &TestHarness) -> TestCheckout {
    let checkout = h.checkout(
        regular_flow(&[Network::BASE, Network::OPTIMISM, Network::ARBITRUM]),
        open_payment(10.0),
        routed_mode(),
    );
    let options = checkout.load_payment_options().await.unwrap();
    assert_eq!(options.len(), 2);
    checkout
}

/// Wallets the router cannot take payment from are excluded, even though the
/// flow's signer controls them.
#[tokio::test]
async fn options_narrow_compatible_wallets() {
    let h = harness(Network::ARBITRUM);
    let checkout = loaded(&h).await;

    let view = checkout.view();
    let networks: Vec<Network> = view.compatible.iter().map(|c| c.wallet.network).collect();
    assert_eq!(networks, vec![Network::OPTIMISM, Network::ARBITRUM]);
    for entry in &view.compatible {
        let ids: Vec<&str> = entry.tokens.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["usdc"]);
    }
    assert_eq!(
        view.selection.wallet.map(|w| w.network),
        Some(Network::ARBITRUM)
    );

    assert!(matches!(
        checkout.select_wallet(Network::BASE),
        Err(CheckoutError::InputIncomplete(_))
    ));
    checkout.select_wallet(Network::OPTIMISM).unwrap();
    assert_eq!(
        checkout.view().selection.token,
        Some(token(Network::OPTIMISM, "usdc"))
    );
}

/// Routed payment records source and fulfillment details in one update.
#[tokio::test]
async fn routed_submit_records_fulfillment() {
    let h = harness(Network::ARBITRUM);
    let checkout = loaded(&h).await;

    let quote = checkout.estimate().await.unwrap();
    assert!(matches!(&quote, Quote::Route(option) if option.payment_amount == "10.07"));

    let hash = checkout.submit().await.unwrap();
    assert_eq!(hash, TxHash::new(DEFAULT_HASH));
    assert_eq!(checkout.state().kind(), StateKind::Confirmed);

    let sessions = h.routing.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].source_network, Network::ARBITRUM);
    assert_eq!(sessions[0].intent.network, Network::BASE);
    assert_eq!(sessions[0].intent.account, wallet_address(Network::ARBITRUM));

    let transfers = h.wallet.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].account, wallet_address(Network::ARBITRUM));
    assert_eq!(transfers[0].network, Network::ARBITRUM);

    let expected = PaymentUpdate {
        hash: Some(TxHash::new(DEFAULT_HASH)),
        fulfillment_id: Some("session-1".into()),
        fulfillment_chain_id: Some(Network::BASE),
        fulfillment_hash: Some(TxHash::new(SPONSORED_HASH)),
        ..Default::default()
    };
    assert_eq!(
        h.backend.payment_updates(),
        vec![(ReferenceId(REFERENCE_ID.into()), expected)]
    );
    let payment = checkout.payment();
    assert_eq!(payment.fulfillment_hash, Some(TxHash::new(SPONSORED_HASH)));
    assert_eq!(payment.fulfillment_chain_id, Some(Network::BASE));
}

#[tokio::test]
async fn missing_fulfillment_hash_fails() {
    let h = harness(Network::ARBITRUM);
    h.routing.drop_sponsored_hash();
    let checkout = loaded(&h).await;
    checkout.estimate().await.unwrap();

    let err = checkout.submit().await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Failed(Failure::Collaborator(_))
    ));
    assert_eq!(checkout.state().failure().and_then(|f| f.status()), None);
    assert_eq!(h.notifier.errors(), vec!["Payment failed".to_string()]);
    assert!(h.backend.payment_updates().is_empty());
}

/// Active network outside the compatible set: the first compatible wallet is
/// selected and a switch is required before signing.
#[tokio::test]
async fn routed_requires_switch_to_source() {
    let h = harness(Network::BASE);
    let checkout = loaded(&h).await;
    assert_eq!(
        checkout.view().selection.wallet.map(|w| w.network),
        Some(Network::OPTIMISM)
    );
    checkout.estimate().await.unwrap();
    assert!(matches!(
        checkout.begin_submission(),
        Err(CheckoutError::NetworkSwitchRequired(Network::OPTIMISM))
    ));
    checkout.switch_network().await.unwrap();
    checkout.submit().await.unwrap();
    assert_eq!(h.routing.sessions()[0].source_network, Network::OPTIMISM);
}

#[tokio::test]
async fn no_options_leaves_nothing_to_pay_with() {
    let h = TestHarness::new(Network::BASE).with_routing(MockRouting::with_options(vec![]));
    let checkout = loaded_empty(&h).await;
    let view = checkout.view();
    assert!(view.compatible.is_empty());
    assert_eq!(view.selection.wallet, None);
    assert!(matches!(
        checkout.estimate().await,
        Err(CheckoutError::InputIncomplete(_))
    ));
    assert_eq!(checkout.state(), CheckoutState::Idle);
    assert_eq!(h.routing.estimates(), 0);
}

async fn loaded_empty(h: &TestHarness) -> TestCheckout {
    let checkout = h.checkout(
        regular_flow(&[Network::BASE, Network::OPTIMISM]),
        open_payment(10.0),
        routed_mode(),
    );
    assert!(checkout.load_payment_options().await.unwrap().is_empty());
    checkout
}

#[tokio::test]
async fn direct_checkout_has_no_payment_options() {
    let h = harness(Network::BASE);
    let checkout = h.checkout(
        regular_flow(&[Network::BASE]),
        fixed_payment(Network::BASE, "usdc", 10.0),
        CheckoutMode::Direct,
    );
    assert!(matches!(
        checkout.load_payment_options().await,
        Err(CheckoutError::InputIncomplete(_))
    ));
}
