//! Fixtures shared by the checkout integration tests.

use payflow_common::address::{address, Address};
use payflow_common::chain::Network;
use payflow_common::flow::{Flow, FlowKind, FlowSigner, FlowWallet, Profile, Recipient};
use payflow_common::payment::{Payment, PaymentStatus, ReferenceId};
use payflow_common::token::{StaticTokenRegistry, Token, TokenRegistry};


pub const SIGNER: Address = address!("0x1000000000000000000000000000000000000001");
pub const IDENTITY: Address = address!("0x2000000000000000000000000000000000000002");
pub const RECIPIENT: Address = address!("0x3000000000000000000000000000000000000003");
pub const REFERENCE_ID: &str = "Pay0001x";

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Deterministic flow wallet address per network.
pub fn wallet_address(network: Network) -> Address {
    Address::left_padding_from(&(0xa000_0000u64 + network.id()).to_be_bytes())
}

pub fn flow_wallet(network: Network, deployed: bool) -> FlowWallet {
    FlowWallet {
        address: wallet_address(network),
        network,
        deployed,
        version: None,
    }
}

fn signer(provider: Option<&str>) -> FlowSigner {
    FlowSigner {
        address: SIGNER,
        provider: provider.map(String::from),
        kind: None,
        credential: None,
    }
}

/// Smart-account flow signed by a provider-managed key, so the profile
/// identity co-owns its accounts. Wallets start undeployed.
pub fn regular_flow(networks: &[Network]) -> Flow {
    Flow {
        uuid: "flow-regular".into(),
        title: "Payflow Balance".into(),
        signer: signer(Some("privy")),
        wallets: networks.iter().map(|n| flow_wallet(*n, false)).collect(),
        archived: false,
        kind: FlowKind::Regular {
            salt_nonce: "payflow-salt-1".into(),
            wallet_provider: Some("safe".into()),
        },
    }
}

/// Externally connected wallet; the signer itself pays.
pub fn linked_flow(networks: &[Network]) -> Flow {
    Flow {
        uuid: "flow-linked".into(),
        title: "Connected wallet".into(),
        signer: signer(None),
        wallets: networks
            .iter()
            .map(|n| FlowWallet {
                address: SIGNER,
                network: *n,
                deployed: true,
                version: None,
            })
            .collect(),
        archived: false,
        kind: FlowKind::Linked,
    }
}

pub fn profile() -> Profile {
    Profile {
        identity: IDENTITY,
        username: Some("alice".into()),
        default_flow: None,
    }
}

pub fn recipient() -> Recipient {
    Recipient::Address(RECIPIENT)
}

pub fn token(network: Network, id: &str) -> Token {
    StaticTokenRegistry
        .token(network, id)
        .unwrap_or_else(|| panic!("no {id} on {network}"))
}

/// A backend payment fixing network, token and amount.
pub fn fixed_payment(network: Network, token_id: &str, amount: f64) -> Payment {
    Payment {
        reference_id: Some(ReferenceId(REFERENCE_ID.into())),
        network: Some(network),
        token: Some(token_id.into()),
        token_amount: Some(amount),
        usd_amount: Some(amount),
        receiver_address: Some(RECIPIENT),
        status: PaymentStatus::Created,
        ..Default::default()
    }
}

/// A payment with no fixed network or token, as used for routed checkouts.
pub fn open_payment(usd_amount: f64) -> Payment {
    Payment {
        reference_id: Some(ReferenceId(REFERENCE_ID.into())),
        usd_amount: Some(usd_amount),
        receiver_address: Some(RECIPIENT),
        ..Default::default()
    }
}
