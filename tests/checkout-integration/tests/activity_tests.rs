use std::collections::HashMap;

use alloy_primitives::U256;
use payflow_checkout::history::fetch_activity;
use payflow_checkout_integration::{flow_wallet, regular_flow};
use payflow_common::activity::{ActivityFilter, ActivityKind, WalletHistory};
use payflow_common::chain::Network;
use payflow_common::flow::FlowWallet;
use payflow_common::services::{ActivitySource, ServiceError};

/// Explorer stub serving canned JSON per network.
struct Explorer {
    pages: HashMap<Network, String>,
}

impl ActivitySource for Explorer {
    async fn fetch_wallet_history(&self, wallet: &FlowWallet) -> Result<WalletHistory, ServiceError> {
        tokio::task::yield_now().await;
        let page = self
            .pages
            .get(&wallet.network)
            .ok_or_else(|| ServiceError::Unavailable(format!("no explorer for {}", wallet.network)))?;
        serde_json::from_str(page).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

fn base_page() -> String {
    let me = flow_wallet(Network::BASE, true).address;
    serde_json::json!({
        "internal": [],
        "erc20": [
            {
                "hash": "0x01",
                "block": 10,
                "timestamp": "2024-05-01T10:00:00Z",
                "from": "0x5000000000000000000000000000000000000005",
                "to": me,
                "kind": "token_transfer",
                "value": "2500000",
                "token": { "symbol": "USDC", "decimals": 6 }
            },
            {
                "hash": "0x02",
                "block": 11,
                "timestamp": "2024-05-01T11:00:00Z",
                "from": me,
                "to": "0x5000000000000000000000000000000000000005",
                "kind": "token_transfer",
                "value": "1000",
                "token": { "symbol": "SPAM", "decimals": 18 }
            }
        ],
        "transactions": [
            {
                "hash": "0x01",
                "block": 10,
                "timestamp": "2024-05-01T10:00:00Z",
                "from": "0x5000000000000000000000000000000000000005",
                "to": me,
                "kind": "2",
                "value": "0"
            },
            {
                "hash": "0x03",
                "block": 12,
                "timestamp": "2024-05-02T09:00:00Z",
                "from": me,
                "to": "0x5000000000000000000000000000000000000005",
                "kind": "2",
                "value": "1000000000000000"
            }
        ]
    })
    .to_string()
}

fn optimism_page() -> String {
    let me = flow_wallet(Network::OPTIMISM, true).address;
    serde_json::json!({
        "internal": [
            {
                "hash": "0x0a",
                "block": 500,
                "timestamp": "2024-05-01T10:30:00Z",
                "from": me,
                "to": me,
                "kind": "call",
                "value": "42"
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn merges_flow_activity_across_networks() {
    let flow = regular_flow(&[Network::BASE, Network::OPTIMISM, Network::ARBITRUM]);
    let explorer = Explorer {
        pages: HashMap::from([
            (Network::BASE, base_page()),
            (Network::OPTIMISM, optimism_page()),
        ]),
    };

    let txs = fetch_activity(&explorer, &flow.wallets, &ActivityFilter::default()).await;

    let summary: Vec<(&str, Network, ActivityKind)> = txs
        .iter()
        .map(|t| (t.hash.as_str(), t.network, t.activity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("0x03", Network::BASE, ActivityKind::Outbound),
            ("0x0a", Network::OPTIMISM, ActivityKind::SelfTransfer),
            ("0x01", Network::BASE, ActivityKind::Inbound),
        ]
    );
    // The ERC-20 record wins over the zero-value duplicate.
    assert_eq!(txs[2].value, U256::from(2_500_000u64));
    assert_eq!(txs[2].token.as_ref().map(|t| t.symbol.as_str()), Some("USDC"));
}
