use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::Network;

/// Smart-account implementation version used when a wallet record has none.
pub const DEFAULT_SMART_ACCOUNT_VERSION: &str = "1.3.0";

/// One deployed-or-predicted account of a flow on a specific network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowWallet {
    pub address: Address,
    pub network: Network,
    /// Flips false → true after the first successful transaction; never back.
    #[serde(default)]
    pub deployed: bool,
    #[serde(default)]
    pub version: Option<String>,
}

impl FlowWallet {
    pub fn version_or_default(&self) -> &str {
        self.version
            .as_deref()
            .unwrap_or(DEFAULT_SMART_ACCOUNT_VERSION)
    }

    /// Mark the wallet deployed. Returns true only on the first call.
    pub fn mark_deployed(&mut self) -> bool {
        if self.deployed {
            return false;
        }
        self.deployed = true;
        true
    }
}

/// Signing identity of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSigner {
    #[serde(rename = "signer")]
    pub address: Address,
    /// External signer provider (e.g. an embedded-wallet vendor), if any.
    #[serde(rename = "signerProvider", default)]
    pub provider: Option<String>,
    #[serde(rename = "signerType", default)]
    pub kind: Option<String>,
    #[serde(rename = "signerCredential", default)]
    pub credential: Option<String>,
}

/// Flow variants. Only smart-account variants carry the salt used to derive
/// their account addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    Regular {
        #[serde(rename = "saltNonce")]
        salt_nonce: String,
        #[serde(rename = "walletProvider", default)]
        wallet_provider: Option<String>,
    },
    Jar {
        #[serde(rename = "saltNonce")]
        salt_nonce: String,
    },
    /// Verified address of a Farcaster account.
    FarcasterVerification,
    /// Externally connected wallet.
    Linked,
    Bankr,
    Rodeo,
}

impl FlowKind {
    pub fn salt_nonce(&self) -> Option<&str> {
        match self {
            FlowKind::Regular { salt_nonce, .. } | FlowKind::Jar { salt_nonce } => {
                Some(salt_nonce)
            }
            FlowKind::FarcasterVerification
            | FlowKind::Linked
            | FlowKind::Bankr
            | FlowKind::Rodeo => None,
        }
    }

    pub fn is_smart_account(&self) -> bool {
        self.salt_nonce().is_some()
    }

    pub fn label(&self) -> &'static str {
        match self {
            FlowKind::Regular { .. } => "regular",
            FlowKind::Jar { .. } => "jar",
            FlowKind::FarcasterVerification => "farcaster-verification",
            FlowKind::Linked => "linked",
            FlowKind::Bankr => "bankr",
            FlowKind::Rodeo => "rodeo",
        }
    }
}

/// Owner set and threshold of a smart account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAccountOwners {
    pub owners: Vec<Address>,
    pub threshold: u32,
}

/// A named set of per-network wallets sharing one signing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub uuid: String,
    pub title: String,
    #[serde(flatten)]
    pub signer: FlowSigner,
    #[serde(default)]
    pub wallets: Vec<FlowWallet>,
    #[serde(default)]
    pub archived: bool,
    #[serde(flatten)]
    pub kind: FlowKind,
}

impl Flow {
    pub fn wallet_on(&self, network: Network) -> Option<&FlowWallet> {
        self.wallets.iter().find(|w| w.network == network)
    }

    pub fn wallet_on_mut(&mut self, network: Network) -> Option<&mut FlowWallet> {
        self.wallets.iter_mut().find(|w| w.network == network)
    }

    pub fn networks(&self) -> Vec<Network> {
        self.wallets.iter().map(|w| w.network).collect()
    }

    /// Owner config for the flow's smart accounts.
    ///
    /// The profile identity becomes a co-owner only when the flow is signed by
    /// a distinct provider-managed key. The flow signer always comes last.
    pub fn owner_config(&self, identity: &Address) -> SmartAccountOwners {
        let mut owners = Vec::with_capacity(2);
        if self.signer.provider.is_some() && self.signer.address != *identity {
            owners.push(*identity);
        }
        owners.push(self.signer.address);
        SmartAccountOwners {
            owners,
            threshold: 1,
        }
    }

    /// Checks that there is at most one wallet per network.
    pub fn has_unique_networks(&self) -> bool {
        let mut networks = self.networks();
        networks.sort();
        networks.windows(2).all(|w| w[0] != w[1])
    }
}

/// A user profile as seen by the sender side of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub identity: Address,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub default_flow: Option<Flow>,
}

/// Who receives a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// A bare address that accepts funds on any network.
    Address(Address),
    /// A Payflow profile's receiving flow.
    Flow(Flow),
}

impl Recipient {
    /// Destination address on `network`, if the recipient can receive there.
    pub fn address_on(&self, network: Network) -> Option<Address> {
        match self {
            Recipient::Address(address) => Some(*address),
            Recipient::Flow(flow) => flow.wallet_on(network).map(|w| w.address),
        }
    }

    /// Networks the recipient accepts, or `None` for any.
    pub fn networks(&self) -> Option<Vec<Network>> {
        match self {
            Recipient::Address(_) => None,
            Recipient::Flow(flow) => Some(flow.networks()),
        }
    }
}
