//! Checkout state machine.
//!
//! ```text
//! Idle → Estimating → Ready → AwaitingSignature → Broadcasting → Confirming
//!   ↑                  │  ↑            │                            │
//!   └──── reset ───────┘  └─ rejected ─┘                  Confirmed | Failed
//! ```

use alloy_primitives::U256;
use payflow_common::address::Address;
use payflow_common::chain::Network;
use payflow_common::flow::FlowWallet;
use payflow_common::resolver::CompatibleWallet;
use payflow_common::routing::PaymentOption;
use payflow_common::token::Token;
use payflow_common::transaction::TxHash;
use serde::{Deserialize, Serialize};

use crate::error::Failure;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutState {
    Idle,
    Estimating,
    Ready,
    AwaitingSignature,
    Broadcasting { hash: TxHash },
    Confirming { hash: TxHash },
    Confirmed { hash: TxHash },
    Failed(Failure),
}

/// Field-less mirror of [`CheckoutState`] for transition checks and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    Idle,
    Estimating,
    Ready,
    AwaitingSignature,
    Broadcasting,
    Confirming,
    Confirmed,
    Failed,
}

impl CheckoutState {
    pub fn kind(&self) -> StateKind {
        match self {
            CheckoutState::Idle => StateKind::Idle,
            CheckoutState::Estimating => StateKind::Estimating,
            CheckoutState::Ready => StateKind::Ready,
            CheckoutState::AwaitingSignature => StateKind::AwaitingSignature,
            CheckoutState::Broadcasting { .. } => StateKind::Broadcasting,
            CheckoutState::Confirming { .. } => StateKind::Confirming,
            CheckoutState::Confirmed { .. } => StateKind::Confirmed,
            CheckoutState::Failed(_) => StateKind::Failed,
        }
    }

    /// A submission lifecycle is active.
    pub fn in_flight(&self) -> bool {
        matches!(
            self.kind(),
            StateKind::AwaitingSignature | StateKind::Broadcasting | StateKind::Confirming
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind(), StateKind::Confirmed | StateKind::Failed)
    }

    /// UI loading flag.
    pub fn is_loading(&self) -> bool {
        self.kind() == StateKind::Estimating || self.in_flight()
    }

    pub fn hash(&self) -> Option<&TxHash> {
        match self {
            CheckoutState::Broadcasting { hash }
            | CheckoutState::Confirming { hash }
            | CheckoutState::Confirmed { hash } => Some(hash),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            CheckoutState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl StateKind {
    /// Returns true if moving from self to `next` is a legal step.
    pub fn can_transition_to(self, next: StateKind) -> bool {
        use StateKind::*;
        matches!(
            (self, next),
            (Idle, Estimating)
                | (Estimating, Ready)
                | (Estimating, Failed)
                | (Estimating, Idle)
                | (Ready, Idle)
                | (Ready, Estimating)
                | (Ready, AwaitingSignature)
                | (AwaitingSignature, Ready)
                | (AwaitingSignature, Broadcasting)
                | (AwaitingSignature, Failed)
                | (Broadcasting, Broadcasting)
                | (Broadcasting, Ready)
                | (Broadcasting, Confirming)
                | (Broadcasting, Failed)
                | (Confirming, Confirmed)
                | (Confirming, Failed)
                | (Confirmed, Idle)
                | (Failed, Idle)
        )
    }
}

/// Affordance the UI must show before the user can continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    /// Active network differs from the selected wallet's network.
    SwitchNetwork { from: Option<Network>, to: Network },
    /// The last switch attempt failed; retrying is allowed.
    SwitchFailed { to: Network, reason: String },
    /// Connected signer is missing or is not the flow's signer.
    ReconnectSigner {
        expected: Address,
        connected: Option<Address>,
    },
}

/// What `estimate` resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Quote {
    /// Direct transfer: balance of the selected token, in base units.
    Balance { amount: U256, decimals: u8 },
    /// Routed payment: quote from the routing service.
    Route(PaymentOption),
}

/// Current wallet/token/amount choice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub wallet: Option<FlowWallet>,
    pub token: Option<Token>,
    /// Amount in base units of `token`.
    pub amount: Option<U256>,
}

impl Selection {
    pub fn is_complete(&self) -> bool {
        self.wallet.is_some() && self.token.is_some()
    }
}

/// Snapshot handed to the UI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckoutView {
    pub state: CheckoutState,
    pub loading: bool,
    pub prompt: Option<Prompt>,
    pub compatible: Vec<CompatibleWallet>,
    pub selection: Selection,
    pub quote: Option<Quote>,
}
