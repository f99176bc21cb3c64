//! Wallet/token compatibility.
//!
//! Narrows a sender flow's wallets down to the (wallet, token) pairs that can
//! pay a given payment and picks defaults. Everything here is a pure function
//! of its inputs; callers re-run it whenever an input changes.

use serde::{Deserialize, Serialize};

use crate::chain::Network;
use crate::currency::PaymentCurrency;
use crate::flow::{Flow, FlowWallet};
use crate::payment::Payment;
use crate::token::{Token, TokenRegistry};

/// Everything the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInput<'a> {
    pub flow: &'a Flow,
    pub payment: Option<&'a Payment>,
    /// Routing may convert currency, so a fixed token does not filter.
    pub cross_chain: bool,
    /// Currencies allowed by a routing quote.
    pub allowed_currencies: Option<&'a [PaymentCurrency]>,
    /// Networks the recipient can receive on; `None` accepts any.
    pub recipient_networks: Option<&'a [Network]>,
    pub active_network: Option<Network>,
    pub current_token: Option<&'a Token>,
}

impl<'a> ResolveInput<'a> {
    pub fn new(flow: &'a Flow) -> Self {
        Self {
            flow,
            payment: None,
            cross_chain: false,
            allowed_currencies: None,
            recipient_networks: None,
            active_network: None,
            current_token: None,
        }
    }
}

/// A wallet together with the tokens it may pay with. `tokens` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleWallet {
    pub wallet: FlowWallet,
    pub tokens: Vec<Token>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub compatible: Vec<CompatibleWallet>,
    pub default_wallet: Option<FlowWallet>,
    pub default_token: Option<Token>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.compatible.is_empty()
    }

    /// Compatible tokens of the wallet on `network`.
    pub fn tokens_for(&self, network: Network) -> &[Token] {
        self.compatible
            .iter()
            .find(|c| c.wallet.network == network)
            .map(|c| c.tokens.as_slice())
            .unwrap_or(&[])
    }

    pub fn wallets(&self) -> impl Iterator<Item = &FlowWallet> {
        self.compatible.iter().map(|c| &c.wallet)
    }

    /// Manually pick the wallet on `network` and re-run token selection.
    /// Returns false (and changes nothing) if that wallet is not compatible.
    pub fn select_wallet(&mut self, network: Network, current_token: Option<&Token>) -> bool {
        let Some(entry) = self.compatible.iter().find(|c| c.wallet.network == network) else {
            return false;
        };
        self.default_token = default_token(&entry.tokens, current_token);
        self.default_wallet = Some(entry.wallet.clone());
        true
    }

    /// Manually pick a token of the selected wallet.
    pub fn select_token(&mut self, token: &Token) -> bool {
        let Some(wallet) = &self.default_wallet else {
            return false;
        };
        if !self.tokens_for(wallet.network).contains(token) {
            return false;
        }
        self.default_token = Some(token.clone());
        true
    }
}

fn allowed(allow_list: Option<&[PaymentCurrency]>, token: &Token) -> bool {
    match allow_list {
        Some(list) => list.iter().any(|c| c.matches(token)),
        None => true,
    }
}

/// The compatible (wallet, tokens) pairs in flow order.
pub fn compatible_wallets(
    input: &ResolveInput<'_>,
    registry: &(impl TokenRegistry + ?Sized),
) -> Vec<CompatibleWallet> {
    let fixed_network = input.payment.and_then(|p| p.network);
    let fixed_token = if input.cross_chain {
        None
    } else {
        input.payment.and_then(|p| p.token.as_deref())
    };
    let recipient_networks = if input.cross_chain {
        None
    } else {
        input.recipient_networks
    };

    let candidates: Vec<&FlowWallet> = match fixed_network {
        Some(network) => input.flow.wallet_on(network).into_iter().collect(),
        None => input.flow.wallets.iter().collect(),
    };

    candidates
        .into_iter()
        .filter(|w| recipient_networks.is_none_or(|nets| nets.contains(&w.network)))
        .filter_map(|wallet| {
            let tokens: Vec<Token> = registry
                .supported_tokens(wallet.network)
                .into_iter()
                .filter(|t| fixed_token.is_none_or(|id| t.id.eq_ignore_ascii_case(id)))
                .filter(|t| allowed(input.allowed_currencies, t))
                .collect();
            if tokens.is_empty() {
                None
            } else {
                Some(CompatibleWallet {
                    wallet: wallet.clone(),
                    tokens,
                })
            }
        })
        .collect()
}

/// The wallet on the active network, else the first compatible one.
pub fn default_wallet(
    compatible: &[CompatibleWallet],
    active_network: Option<Network>,
) -> Option<&CompatibleWallet> {
    active_network
        .and_then(|n| compatible.iter().find(|c| c.wallet.network == n))
        .or_else(|| compatible.first())
}

/// Keep `current` if it is still offered, else the first token.
pub fn default_token(tokens: &[Token], current: Option<&Token>) -> Option<Token> {
    match current {
        Some(token) if tokens.contains(token) => Some(token.clone()),
        _ => tokens.first().cloned(),
    }
}

/// Compatible set plus default selection. An empty compatible set yields no
/// defaults; it is up to the caller to present that as "no route".
pub fn resolve(
    input: &ResolveInput<'_>,
    registry: &(impl TokenRegistry + ?Sized),
) -> Resolution {
    let compatible = compatible_wallets(input, registry);
    let (default_wallet, default_token) = match default_wallet(&compatible, input.active_network)
    {
        Some(entry) => (
            Some(entry.wallet.clone()),
            default_token(&entry.tokens, input.current_token),
        ),
        None => (None, None),
    };
    Resolution {
        compatible,
        default_wallet,
        default_token,
    }
}
