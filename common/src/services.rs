//! Collaborator contracts the checkout drives.
//!
//! Each trait is one external party: the Payflow backend, the connected
//! wallet, the smart-account kit and the cross-chain router. Host
//! applications plug in real clients, and tests plug in in-memory ones.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::activity::WalletHistory;
use crate::address::Address;
use crate::chain::Network;
use crate::currency::PaymentCurrency;
use crate::flow::{Flow, FlowWallet, SmartAccountOwners};
use crate::payment::{Payment, PaymentUpdate, ReferenceId};
use crate::routing::{PaymentIntent, PaymentOption, RoutingSession, SessionOutcome};
use crate::token::Token;
use crate::transaction::{ChainTransaction, Receipt, TransactionRequest, TxHash};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors from backend HTTP calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceError {
    NotFound(String),
    UnexpectedStatus { status: u16 },
    Decode(String),
    Invalid(String),
    Unavailable(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::UnexpectedStatus { status } => write!(f, "unexpected status {status}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid request: {msg}"),
            Self::Unavailable(msg) => write!(f, "backend unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Errors from the connected wallet or smart-account kit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletError {
    /// The user declined the signature request.
    Rejected,
    Disconnected,
    SwitchFailed(String),
    InsufficientFees,
    SponsorshipFailed(String),
    Failed(String),
    Unavailable(String),
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected => write!(f, "signature request rejected"),
            Self::Disconnected => write!(f, "wallet disconnected"),
            Self::SwitchFailed(msg) => write!(f, "network switch failed: {msg}"),
            Self::InsufficientFees => write!(f, "insufficient gas fees"),
            Self::SponsorshipFailed(reason) => write!(f, "gas sponsorship failed: {reason}"),
            Self::Failed(msg) => write!(f, "transaction failed: {msg}"),
            Self::Unavailable(msg) => write!(f, "wallet unavailable: {msg}"),
        }
    }
}

impl std::error::Error for WalletError {}

/// Errors from the cross-chain routing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingError {
    NoRoute,
    Session(String),
    /// The signing callback failed inside a session.
    Wallet(WalletError),
    Unavailable(String),
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRoute => write!(f, "no payment route"),
            Self::Session(msg) => write!(f, "routing session failed: {msg}"),
            Self::Wallet(err) => write!(f, "{err}"),
            Self::Unavailable(msg) => write!(f, "routing unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RoutingError {}

impl From<WalletError> for RoutingError {
    fn from(err: WalletError) -> Self {
        RoutingError::Wallet(err)
    }
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Payment records on the Payflow backend.
#[allow(async_fn_in_trait)]
pub trait PaymentService {
    async fn create_payment(&self, payment: &Payment) -> Result<ReferenceId, ServiceError>;

    async fn get_payment(&self, reference_id: &ReferenceId) -> Result<Payment, ServiceError>;

    async fn update_payment(
        &self,
        reference_id: &ReferenceId,
        update: &PaymentUpdate,
    ) -> Result<(), ServiceError>;

    async fn cancel_payment(&self, reference_id: &ReferenceId) -> Result<(), ServiceError>;
}

/// Flow records on the Payflow backend.
#[allow(async_fn_in_trait)]
pub trait FlowService {
    async fn create_flow(&self, flow: &Flow) -> Result<(), ServiceError>;

    async fn set_default_receiving_flow(&self, flow_uuid: &str) -> Result<(), ServiceError>;

    async fn update_wallet(&self, flow_uuid: &str, wallet: &FlowWallet)
        -> Result<(), ServiceError>;

    async fn archive_flow(&self, flow_uuid: &str) -> Result<(), ServiceError>;

    async fn rename_flow(&self, flow_uuid: &str, title: &str) -> Result<(), ServiceError>;
}

/// Transaction history for one wallet, from a block explorer or indexer.
#[allow(async_fn_in_trait)]
pub trait ActivitySource {
    async fn fetch_wallet_history(&self, wallet: &FlowWallet)
        -> Result<WalletHistory, ServiceError>;
}

// ─── Wallet ──────────────────────────────────────────────────────────────────

/// The connected signer and its RPC access.
#[allow(async_fn_in_trait)]
pub trait WalletClient {
    /// Currently connected signer address, `None` when disconnected.
    fn connected_address(&self) -> Option<Address>;

    /// Network the wallet is currently on.
    fn active_network(&self) -> Option<Network>;

    async fn switch_network(&self, network: Network) -> Result<(), WalletError>;

    /// Balance of `token` held by `owner`, in base units.
    async fn balance(
        &self,
        owner: &Address,
        network: Network,
        token: &Token,
    ) -> Result<U256, WalletError>;

    /// Sign and broadcast a transaction from the connected signer.
    async fn send_transaction(
        &self,
        network: Network,
        request: &TransactionRequest,
    ) -> Result<TxHash, WalletError>;

    async fn wait_for_receipt(&self, network: Network, hash: &TxHash)
        -> Result<Receipt, WalletError>;
}

/// Everything needed to execute one call through a flow's smart account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAccountTransferRequest {
    /// Account address, deployed or predicted.
    pub account: Address,
    pub network: Network,
    pub owners: SmartAccountOwners,
    pub salt_nonce: String,
    pub version: String,
    pub call: TransactionRequest,
}

/// Smart-account kit: deploys the account if needed and executes the call,
/// signing with the connected owner.
#[allow(async_fn_in_trait)]
pub trait SmartAccountTransfer {
    async fn transfer(&self, request: &SmartAccountTransferRequest) -> Result<TxHash, WalletError>;
}

// ─── Routing ─────────────────────────────────────────────────────────────────

/// Signing callback handed to a routing session.
#[allow(async_fn_in_trait)]
pub trait TransactionSender {
    async fn send_transaction(&self, tx: &ChainTransaction) -> Result<TxHash, WalletError>;
}

/// External cross-chain payment service.
#[allow(async_fn_in_trait)]
pub trait RoutingService {
    async fn list_payment_options(
        &self,
        intent: &PaymentIntent,
    ) -> Result<Vec<PaymentOption>, RoutingError>;

    /// Quote for paying with `currency`; `None` when it cannot cover the intent.
    async fn estimate_payment(
        &self,
        intent: &PaymentIntent,
        currency: &PaymentCurrency,
    ) -> Result<Option<PaymentOption>, RoutingError>;

    async fn create_session(
        &self,
        intent: &PaymentIntent,
        currency: &PaymentCurrency,
        current_network: Network,
    ) -> Result<RoutingSession, RoutingError>;

    /// Drive the session. The router decides the source call(s) and asks
    /// `sender` to sign them.
    async fn execute_session<S: TransactionSender>(
        &self,
        session: &RoutingSession,
        sender: &S,
    ) -> Result<SessionOutcome, RoutingError>;
}
