use std::fmt;

use alloy_primitives::utils::{self as units, ParseUnits};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::address::{address, Address};
use crate::chain::Network;
use crate::currency::PaymentCurrency;

/// A supported fungible asset on one network. `address` is `None` for the
/// network's native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Logical id shared across networks (e.g. "usdc").
    pub id: String,
    pub name: String,
    #[serde(rename = "chainId")]
    pub network: Network,
    #[serde(rename = "tokenAddress", default)]
    pub address: Option<Address>,
    pub decimals: u8,
}

impl Token {
    pub fn is_native(&self) -> bool {
        self.address.is_none()
    }

    pub fn currency(&self) -> PaymentCurrency {
        PaymentCurrency::for_token(self)
    }
}

/// Source of the tokens Payflow accepts on each network.
pub trait TokenRegistry {
    fn supported_tokens(&self, network: Network) -> Vec<Token>;

    fn token(&self, network: Network, id: &str) -> Option<Token> {
        self.supported_tokens(network)
            .into_iter()
            .find(|t| t.id.eq_ignore_ascii_case(id))
    }
}

/// (network, id, name, contract address, decimals)
type TokenRow = (Network, &'static str, &'static str, Option<Address>, u8);

const TOKENS: &[TokenRow] = &[
    (Network::BASE, "eth", "Ether", None, 18),
    (
        Network::BASE,
        "usdc",
        "USD Coin",
        Some(address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")),
        6,
    ),
    (
        Network::BASE,
        "degen",
        "Degen",
        Some(address!("0x4ed4E862860beD51a9570b96d89aF5E1B0Efefed")),
        18,
    ),
    (Network::OPTIMISM, "eth", "Ether", None, 18),
    (
        Network::OPTIMISM,
        "usdc",
        "USD Coin",
        Some(address!("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85")),
        6,
    ),
    (Network::ZORA, "eth", "Ether", None, 18),
    (Network::DEGEN, "degen", "Degen", None, 18),
    (Network::ARBITRUM, "eth", "Ether", None, 18),
    (
        Network::ARBITRUM,
        "usdc",
        "USD Coin",
        Some(address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831")),
        6,
    ),
    (Network::MODE, "eth", "Ether", None, 18),
    (Network::HAM, "eth", "Ether", None, 18),
    (Network::BASE_SEPOLIA, "eth", "Ether", None, 18),
    (
        Network::BASE_SEPOLIA,
        "usdc",
        "USD Coin",
        Some(address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e")),
        6,
    ),
];

/// Built-in token table for the supported networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTokenRegistry;

impl TokenRegistry for StaticTokenRegistry {
    fn supported_tokens(&self, network: Network) -> Vec<Token> {
        TOKENS
            .iter()
            .filter(|(n, ..)| *n == network)
            .map(|(n, id, name, address, decimals)| Token {
                id: id.to_string(),
                name: name.to_string(),
                network: *n,
                address: *address,
                decimals: *decimals,
            })
            .collect()
    }
}

// ─── Unit conversion ─────────────────────────────────────────────────────────

/// Errors from decimal/base-unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsError {
    Empty,
    Invalid(String),
    /// More fractional digits than the token has decimals.
    Precision { decimals: u8 },
    Negative,
}

impl fmt::Display for UnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty amount"),
            Self::Invalid(s) => write!(f, "invalid amount: {s}"),
            Self::Precision { decimals } => {
                write!(f, "amount has more than {decimals} fractional digits")
            }
            Self::Negative => write!(f, "amount is negative"),
        }
    }
}

impl std::error::Error for UnitsError {}

fn fraction_digits(amount: &str) -> usize {
    amount.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

fn to_base_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }
    if !amount.bytes().any(|b| b.is_ascii_digit()) {
        return Err(UnitsError::Invalid(amount.to_string()));
    }
    match units::parse_units(amount, decimals) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(UnitsError::Negative),
        Err(err) => Err(UnitsError::Invalid(format!("{amount}: {err}"))),
    }
}

/// Convert a typed decimal string ("1.5") into base units for `decimals`.
/// Digits below the token's precision are rejected.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    let significant = amount
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.trim_end_matches('0').len());
    if significant > usize::from(decimals) {
        return Err(UnitsError::Precision { decimals });
    }
    to_base_units(amount, decimals)
}

/// Convert a decimal string into base units, rounding half up at the token's
/// precision. Amounts that went through a float (`0.1 + 0.2`) carry noise
/// digits past any token's decimals.
pub fn parse_units_rounded(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    let digits = fraction_digits(amount);
    if digits <= usize::from(decimals) {
        return to_base_units(amount, decimals);
    }
    let precision =
        u8::try_from(digits).map_err(|_| UnitsError::Invalid(amount.to_string()))?;
    let precise = to_base_units(amount, precision)?;
    let scale = U256::from(10u64).pow(U256::from(precision - decimals));
    let (quotient, remainder) = (precise / scale, precise % scale);
    if remainder * U256::from(2u64) >= scale {
        Ok(quotient + U256::from(1u64))
    } else {
        Ok(quotient)
    }
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    match units::format_units(value, decimals) {
        Ok(formatted) => match formatted.split_once('.') {
            Some((whole, fraction)) => {
                let fraction = fraction.trim_end_matches('0');
                if fraction.is_empty() {
                    whole.to_string()
                } else {
                    format!("{whole}.{fraction}")
                }
            }
            None => formatted,
        },
        Err(_) => value.to_string(),
    }
}
