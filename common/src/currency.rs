//! CAIP-19 style payment currency identifiers.
//!
//! Routing quotes name the currency a sender can pay with as
//! `eip155:<chainId>/<asset-namespace>:<asset-reference>`:
//!
//! - ERC-20 tokens: `eip155:8453/erc20:0x8335…2913`
//! - native coins: `eip155:10/slip44:60`, except Degen whose native coin is
//!   registered as `slip44:33436`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::chain::{ChainReference, ChainReferenceError, Network};
use crate::token::Token;

/// SLIP-44 coin type used for ETH-denominated native currencies.
pub const NATIVE_COIN_TYPE: u32 = 60;
/// SLIP-44 coin type of Degen chain's native DEGEN.
pub const DEGEN_NATIVE_COIN_TYPE: u32 = 33436;

/// Asset part of a payment currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Asset {
    Erc20(Address),
    Slip44(u32),
}

/// A currency on a specific network that a payment can be made in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaymentCurrency {
    pub network: Network,
    pub asset: Asset,
}

/// Errors from parsing a currency identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurrencyParseError {
    MissingAsset(String),
    InvalidChain(ChainReferenceError),
    MissingSeparator(String),
    UnsupportedNamespace(String),
    InvalidChainId(String),
    InvalidAsset(String),
}

impl fmt::Display for CurrencyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAsset(s) => write!(f, "currency {s} has no asset part"),
            Self::InvalidChain(err) => write!(f, "{err}"),
            Self::MissingSeparator(s) => write!(f, "missing ':' in {s}"),
            Self::UnsupportedNamespace(s) => write!(f, "unsupported namespace {s}"),
            Self::InvalidChainId(s) => write!(f, "invalid chain id {s}"),
            Self::InvalidAsset(s) => write!(f, "invalid asset {s}"),
        }
    }
}

impl std::error::Error for CurrencyParseError {}

/// Native coin type for a network.
pub fn native_coin_type(network: Network) -> u32 {
    if network == Network::DEGEN {
        DEGEN_NATIVE_COIN_TYPE
    } else {
        NATIVE_COIN_TYPE
    }
}

impl PaymentCurrency {
    pub fn native(network: Network) -> Self {
        Self {
            network,
            asset: Asset::Slip44(native_coin_type(network)),
        }
    }

    pub fn erc20(network: Network, address: Address) -> Self {
        Self {
            network,
            asset: Asset::Erc20(address),
        }
    }

    pub fn for_token(token: &Token) -> Self {
        match &token.address {
            Some(address) => Self::erc20(token.network, *address),
            None => Self::native(token.network),
        }
    }

    /// True if this currency designates `token`.
    pub fn matches(&self, token: &Token) -> bool {
        *self == Self::for_token(token)
    }
}

impl fmt::Display for PaymentCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain = ChainReference::eip155(self.network);
        match &self.asset {
            Asset::Erc20(address) => write!(f, "{chain}/erc20:{address}"),
            Asset::Slip44(code) => write!(f, "{chain}/slip44:{code}"),
        }
    }
}

fn split_pair(s: &str) -> Result<(&str, &str), CurrencyParseError> {
    s.split_once(':')
        .ok_or_else(|| CurrencyParseError::MissingSeparator(s.to_string()))
}

impl FromStr for PaymentCurrency {
    type Err = CurrencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (chain, asset) = s
            .split_once('/')
            .ok_or_else(|| CurrencyParseError::MissingAsset(s.to_string()))?;

        let chain: ChainReference = chain.parse().map_err(CurrencyParseError::InvalidChain)?;
        if !chain.is_evm() {
            return Err(CurrencyParseError::UnsupportedNamespace(chain.namespace));
        }
        let network = chain
            .network()
            .ok_or_else(|| CurrencyParseError::InvalidChainId(chain.reference.clone()))?;

        let (asset_namespace, asset_reference) = split_pair(asset)?;
        let asset = match asset_namespace.to_ascii_lowercase().as_str() {
            "erc20" => Asset::Erc20(
                asset_reference
                    .parse::<Address>()
                    .map_err(|_| CurrencyParseError::InvalidAsset(asset.to_string()))?,
            ),
            "slip44" => Asset::Slip44(
                asset_reference
                    .parse()
                    .map_err(|_| CurrencyParseError::InvalidAsset(asset.to_string()))?,
            ),
            _ => return Err(CurrencyParseError::InvalidAsset(asset.to_string())),
        };
        Ok(Self { network, asset })
    }
}

impl Serialize for PaymentCurrency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PaymentCurrency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
