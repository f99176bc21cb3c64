use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::Network;
use crate::currency::PaymentCurrency;
use crate::token::Token;
use crate::transaction::{TransactionRequest, TxHash};

/// An externally quoted route: pay `payment_amount` of `payment_currency`
/// (routing and sponsorship fees included) to settle the intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub payment_currency: PaymentCurrency,
    /// Decimal amount in the payment currency.
    pub payment_amount: String,
    pub currency_symbol: String,
    #[serde(default)]
    pub currency_name: Option<String>,
    #[serde(default)]
    pub total_fee_usd: Option<String>,
}

/// The destination call a routed payment must end up executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    /// Paying account on the source side.
    pub account: Address,
    /// Network the destination call executes on.
    #[serde(rename = "chainId")]
    pub network: Network,
    pub call: TransactionRequest,
}

/// A routing session created for one payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingSession {
    pub session_id: String,
    pub payment_currency: PaymentCurrency,
    /// Network the source transaction is sent from.
    pub source_network: Network,
    pub intent: PaymentIntent,
}

/// Result of executing a routing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    /// Destination-side transaction submitted by the router.
    #[serde(default)]
    pub sponsored_transaction_hash: Option<TxHash>,
}

/// The quoted option that pays with `token`, if any.
pub fn find_payment_option<'a>(
    options: &'a [PaymentOption],
    token: &Token,
) -> Option<&'a PaymentOption> {
    options.iter().find(|o| o.payment_currency.matches(token))
}

/// Currencies the routing quote allows paying with.
pub fn enabled_currencies(options: &[PaymentOption]) -> Vec<PaymentCurrency> {
    options.iter().map(|o| o.payment_currency.clone()).collect()
}
