use std::collections::HashSet;

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{address, Address};
use crate::chain::Network;
use crate::flow::FlowWallet;
use crate::transaction::TxHash;

/// Direction of a transaction relative to the wallet it was fetched for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    SelfTransfer,
    Inbound,
    Outbound,
}

/// Token metadata attached to ERC-20 transfers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

/// One transaction as reported by the explorer, before classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTx {
    pub hash: TxHash,
    pub block: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    /// Explorer type tag: "call", "token_transfer", or the EIP-2718 type ("2").
    pub kind: String,
    #[serde(default)]
    pub value: U256,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub token: Option<TokenRef>,
}

fn default_success() -> bool {
    true
}

/// All explorer lists fetched for one wallet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletHistory {
    pub internal: Vec<RawTx>,
    pub erc20: Vec<RawTx>,
    pub transactions: Vec<RawTx>,
}

/// A classified activity entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxInfo {
    pub network: Network,
    pub block: u64,
    pub hash: TxHash,
    pub timestamp: DateTime<Utc>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub kind: String,
    pub value: U256,
    pub token: Option<TokenRef>,
    pub activity: ActivityKind,
}

/// Which entries count as payment activity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityFilter {
    pub kinds: Vec<String>,
    /// Only ERC-20 transfers of these symbols are shown.
    pub tracked_symbols: Vec<String>,
    /// Infrastructure contracts whose calls are noise (e.g. the account factory).
    pub ignored_addresses: Vec<Address>,
}

impl Default for ActivityFilter {
    fn default() -> Self {
        Self {
            kinds: vec!["call".into(), "2".into(), "token_transfer".into()],
            tracked_symbols: vec!["USDC".into(), "DEGEN".into()],
            ignored_addresses: vec![address!("0x3AC05161b76a35c1c28dC99Aa01BEd7B24cEA3bf")],
        }
    }
}

impl ActivityFilter {
    fn accepts(&self, tx: &RawTx) -> bool {
        if !tx.success || tx.value.is_zero() {
            return false;
        }
        if !self.kinds.iter().any(|k| *k == tx.kind) {
            return false;
        }
        if let Some(to) = &tx.to {
            if self.ignored_addresses.contains(to) {
                return false;
            }
        }
        match &tx.token {
            Some(token) => self
                .tracked_symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&token.symbol)),
            None => true,
        }
    }
}

fn classify(wallet: &FlowWallet, tx: &RawTx) -> ActivityKind {
    if tx.from.is_some() && tx.from == tx.to {
        ActivityKind::SelfTransfer
    } else if tx.to.as_ref() == Some(&wallet.address) {
        ActivityKind::Inbound
    } else {
        ActivityKind::Outbound
    }
}

/// Merge one wallet's explorer lists into classified activity.
///
/// Lists are taken in priority order internal → ERC-20 → regular; a hash that
/// already appeared in an earlier list is dropped from later ones.
pub fn merge_wallet_history(
    wallet: &FlowWallet,
    history: WalletHistory,
    filter: &ActivityFilter,
) -> Vec<TxInfo> {
    let mut seen: HashSet<TxHash> = HashSet::new();
    let WalletHistory {
        internal,
        erc20,
        transactions,
    } = history;

    internal
        .into_iter()
        .chain(erc20)
        .chain(transactions)
        .filter(|tx| seen.insert(tx.hash.clone()))
        .filter(|tx| filter.accepts(tx))
        .map(|tx| {
            let activity = classify(wallet, &tx);
            TxInfo {
                network: wallet.network,
                block: tx.block,
                hash: tx.hash,
                timestamp: tx.timestamp,
                from: tx.from,
                to: tx.to,
                kind: tx.kind,
                value: tx.value,
                token: tx.token,
                activity,
            }
        })
        .collect()
}

/// Newest first; ties broken by block then hash for a stable order.
pub fn sort_newest_first(txs: &mut [TxInfo]) {
    txs.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.block.cmp(&a.block))
            .then_with(|| a.hash.as_str().cmp(b.hash.as_str()))
    });
}
