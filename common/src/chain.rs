use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::transaction::TxHash;

/// EIP-155 chain id of a supported network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Network(pub u64);

impl Network {
    pub const OPTIMISM: Network = Network(10);
    pub const HAM: Network = Network(5112);
    pub const BASE: Network = Network(8453);
    pub const MODE: Network = Network(34443);
    pub const ARBITRUM: Network = Network(42161);
    pub const BASE_SEPOLIA: Network = Network(84532);
    pub const ZORA: Network = Network(7777777);
    pub const DEGEN: Network = Network(666666666);

    pub fn id(self) -> u64 {
        self.0
    }

    /// Static metadata, if this network is one Payflow supports.
    pub fn info(self) -> Option<&'static ChainInfo> {
        chain_info(self)
    }

    /// Display name, falling back to the raw chain id.
    pub fn display_name(self) -> String {
        match self.info() {
            Some(info) => info.display_name.to_string(),
            None => format!("Chain {}", self.0),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static chain metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    pub network: Network,
    /// Canonical lowercase name used in URLs and config (e.g. "base").
    pub name: &'static str,
    pub display_name: &'static str,
    /// Block explorer base URL without trailing slash.
    pub explorer_url: &'static str,
    pub native_symbol: &'static str,
    pub testnet: bool,
}

impl ChainInfo {
    pub fn tx_url(&self, hash: &TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url, hash)
    }

    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }
}

pub const SUPPORTED_CHAINS: &[ChainInfo] = &[
    ChainInfo {
        network: Network::BASE,
        name: "base",
        display_name: "Base",
        explorer_url: "https://basescan.org",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::OPTIMISM,
        name: "optimism",
        display_name: "Optimism",
        explorer_url: "https://optimistic.etherscan.io",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::ZORA,
        name: "zora",
        display_name: "Zora",
        explorer_url: "https://explorer.zora.energy",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::DEGEN,
        name: "degen",
        display_name: "Degen",
        explorer_url: "https://explorer.degen.tips",
        native_symbol: "DEGEN",
        testnet: false,
    },
    ChainInfo {
        network: Network::ARBITRUM,
        name: "arbitrum",
        display_name: "Arbitrum",
        explorer_url: "https://arbiscan.io",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::MODE,
        name: "mode",
        display_name: "Mode",
        explorer_url: "https://explorer.mode.network",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::HAM,
        name: "ham",
        display_name: "Ham",
        explorer_url: "https://explorer.ham.fun",
        native_symbol: "ETH",
        testnet: false,
    },
    ChainInfo {
        network: Network::BASE_SEPOLIA,
        name: "base-sepolia",
        display_name: "Base Sepolia",
        explorer_url: "https://sepolia.basescan.org",
        native_symbol: "ETH",
        testnet: true,
    },
];

pub fn chain_info(network: Network) -> Option<&'static ChainInfo> {
    SUPPORTED_CHAINS.iter().find(|c| c.network == network)
}

/// Look up a chain by canonical name, case-insensitively.
pub fn chain_by_name(name: &str) -> Option<&'static ChainInfo> {
    SUPPORTED_CHAINS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}

// ─── CAIP-2 ──────────────────────────────────────────────────────────────────

/// A CAIP-2 chain identifier, `namespace:reference` (`eip155:8453`).
///
/// The namespace is stored lowercase; `EIP155:10` and `eip155:10` name the
/// same chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainReference {
    pub namespace: String,
    pub reference: String,
}

/// Errors from parsing a CAIP-2 chain identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainReferenceError {
    MissingSeparator(String),
    /// Namespaces are 3-8 characters of `[-a-z0-9]`.
    InvalidNamespace(String),
    /// References are 1-32 characters of `[-_a-zA-Z0-9]`.
    InvalidReference(String),
}

impl fmt::Display for ChainReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator(s) => write!(f, "missing ':' in chain id {s}"),
            Self::InvalidNamespace(s) => write!(f, "invalid chain namespace {s}"),
            Self::InvalidReference(s) => write!(f, "invalid chain reference {s}"),
        }
    }
}

impl std::error::Error for ChainReferenceError {}

impl ChainReference {
    pub const EIP155: &'static str = "eip155";

    pub fn new(namespace: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    pub fn eip155(network: Network) -> Self {
        Self::new(Self::EIP155, network.id().to_string())
    }

    pub fn is_evm(&self) -> bool {
        self.namespace == Self::EIP155
    }

    /// The EVM network this names, if it is an `eip155` chain with a numeric
    /// reference.
    pub fn network(&self) -> Option<Network> {
        if !self.is_evm() {
            return None;
        }
        self.reference.parse().ok().map(Network)
    }

    fn validate_namespace(namespace: &str) -> Result<(), ChainReferenceError> {
        let valid = (3..=8).contains(&namespace.len())
            && namespace
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(ChainReferenceError::InvalidNamespace(namespace.to_string()))
        }
    }

    fn validate_reference(reference: &str) -> Result<(), ChainReferenceError> {
        let valid = (1..=32).contains(&reference.len())
            && reference
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(())
        } else {
            Err(ChainReferenceError::InvalidReference(reference.to_string()))
        }
    }
}

impl From<Network> for ChainReference {
    fn from(network: Network) -> Self {
        Self::eip155(network)
    }
}

impl fmt::Display for ChainReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl FromStr for ChainReference {
    type Err = ChainReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, reference) = s
            .split_once(':')
            .ok_or_else(|| ChainReferenceError::MissingSeparator(s.to_string()))?;
        let namespace = namespace.to_ascii_lowercase();
        Self::validate_namespace(&namespace)?;
        Self::validate_reference(reference)?;
        Ok(Self::new(namespace, reference))
    }
}

impl Serialize for ChainReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
