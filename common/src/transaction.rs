use std::fmt;

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::Network;
use crate::token::Token;

sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Transaction hash as returned by a wallet or RPC node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A call to submit: target, optional calldata and native value in wei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default)]
    pub value: U256,
}

impl TransactionRequest {
    pub fn native_transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            data: None,
            value,
        }
    }

    pub fn erc20_transfer(token: Address, to: Address, amount: U256) -> Self {
        Self {
            to: token,
            data: Some(erc20_transfer_calldata(to, amount)),
            value: U256::ZERO,
        }
    }

    /// Transfer `amount` base units of `token` to `to`, native or ERC-20.
    pub fn token_transfer(token: &Token, to: Address, amount: U256) -> Self {
        match token.address {
            Some(contract) => Self::erc20_transfer(contract, to, amount),
            None => Self::native_transfer(to, amount),
        }
    }
}

/// A transaction bound to the network it must be sent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub network: Network,
    pub request: TransactionRequest,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub success: bool,
    #[serde(default)]
    pub revert_reason: Option<String>,
}

impl Receipt {
    pub fn success() -> Self {
        Self {
            success: true,
            revert_reason: None,
        }
    }

    pub fn reverted(reason: Option<String>) -> Self {
        Self {
            success: false,
            revert_reason: reason,
        }
    }
}

/// ABI-encoded calldata for `transfer(to, amount)`.
pub fn erc20_transfer_calldata(to: Address, amount: U256) -> Bytes {
    IERC20::transferCall { to, amount }.abi_encode().into()
}
