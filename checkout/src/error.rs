use payflow_common::chain::Network;
use payflow_common::services::{RoutingError, ServiceError, WalletError};
use payflow_common::token::UnitsError;
use serde::{Deserialize, Serialize};

use crate::state::StateKind;

const SPONSORSHIP_PREFIX: &str = "gas_sponsorship_failure";

/// Why a submission ended in `Failed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// No balance or quote could cover the payment.
    NoRoute,
    InsufficientFees,
    GasSponsorship(String),
    /// The receipt reported a revert without a classified reason.
    Reverted(Option<String>),
    /// A collaborator failed (HTTP, RPC, routing service).
    Collaborator(String),
}

impl Failure {
    /// Machine-readable status, `None` for generic failures.
    pub fn status(&self) -> Option<String> {
        match self {
            Failure::NoRoute => Some("no_route".to_string()),
            Failure::InsufficientFees => Some("insufficient_fees".to_string()),
            Failure::GasSponsorship(reason) => Some(format!("{SPONSORSHIP_PREFIX}:{reason}")),
            Failure::Reverted(_) | Failure::Collaborator(_) => None,
        }
    }

    /// Classify a revert reason reported by the receipt.
    pub fn from_revert(reason: Option<&str>) -> Self {
        match reason {
            Some("insufficient_fees") => Failure::InsufficientFees,
            Some(r) => match r.split_once(':') {
                Some((SPONSORSHIP_PREFIX, detail)) => Failure::GasSponsorship(detail.to_string()),
                _ => Failure::Reverted(Some(r.to_string())),
            },
            None => Failure::Reverted(None),
        }
    }

    /// Text for the error toast.
    pub fn user_message(&self) -> String {
        match self {
            Failure::NoRoute => "No balance or route to pay with".to_string(),
            Failure::InsufficientFees => "Insufficient gas fees".to_string(),
            Failure::GasSponsorship(reason) => format!("Failed to sponsor tx: {reason}"),
            Failure::Reverted(_) | Failure::Collaborator(_) => "Payment failed".to_string(),
        }
    }
}

impl From<&WalletError> for Failure {
    fn from(err: &WalletError) -> Self {
        match err {
            WalletError::InsufficientFees => Failure::InsufficientFees,
            WalletError::SponsorshipFailed(reason) => Failure::GasSponsorship(reason.clone()),
            other => Failure::Collaborator(other.to_string()),
        }
    }
}

impl From<&RoutingError> for Failure {
    fn from(err: &RoutingError) -> Self {
        match err {
            RoutingError::NoRoute => Failure::NoRoute,
            RoutingError::Wallet(wallet) => Failure::from(wallet),
            other => Failure::Collaborator(other.to_string()),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status() {
            Some(status) => f.write_str(&status),
            None => match self {
                Failure::Reverted(Some(reason)) => write!(f, "reverted: {reason}"),
                Failure::Reverted(None) => f.write_str("reverted"),
                Failure::Collaborator(msg) => f.write_str(msg),
                _ => f.write_str("failed"),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Nothing to submit yet; the UI just keeps the button disabled.
    #[error("selection incomplete: missing {0}")]
    InputIncomplete(&'static str),

    #[error("no route available for this payment")]
    RouteUnavailable,

    #[error("connected signer {connected:?} does not match flow signer {expected}")]
    SignerMismatch {
        expected: String,
        connected: Option<String>,
    },

    #[error("switch to {0} before signing")]
    NetworkSwitchRequired(Network),

    #[error("signature rejected")]
    SignatureRejected,

    #[error("a submission is already in flight for this payment")]
    SubmissionInFlight,

    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: StateKind, to: StateKind },

    #[error("checkout was detached")]
    Detached,

    /// The selection changed while an estimate was pending.
    #[error("selection changed while estimating")]
    Superseded,

    #[error("payment failed: {0}")]
    Failed(Failure),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("backend error: {0}")]
    Service(#[from] ServiceError),

    #[error("invalid amount: {0}")]
    Amount(#[from] UnitsError),
}
