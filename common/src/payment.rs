use std::fmt;

use alloy_primitives::U256;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::Network;
use crate::token::{parse_units_rounded, UnitsError};
use crate::transaction::TxHash;

/// Length of backend-generated payment reference ids.
pub const REFERENCE_ID_LEN: usize = 8;

/// Backend reference of a payment intent, independent of any transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(pub String);

impl ReferenceId {
    /// Random alphanumeric reference, same shape the backend hands out.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFERENCE_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the payment intent was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[default]
    App,
    Intent,
    Frame,
}

/// What the payment pays for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentCategory {
    #[default]
    Transfer,
    /// Farcaster storage rental; `token_amount` counts storage units.
    FcStorage,
    Mint,
    Hypersub,
    FanToken,
    Other(String),
}

impl PaymentCategory {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentCategory::Transfer => "transfer",
            PaymentCategory::FcStorage => "fc_storage",
            PaymentCategory::Mint => "mint",
            PaymentCategory::Hypersub => "hypersub",
            PaymentCategory::FanToken => "fan",
            PaymentCategory::Other(s) => s,
        }
    }
}

impl From<String> for PaymentCategory {
    fn from(s: String) -> Self {
        match s.as_str() {
            "transfer" => PaymentCategory::Transfer,
            "fc_storage" => PaymentCategory::FcStorage,
            "mint" => PaymentCategory::Mint,
            "hypersub" => PaymentCategory::Hypersub,
            "fan" => PaymentCategory::FanToken,
            _ => PaymentCategory::Other(s),
        }
    }
}

impl From<PaymentCategory> for String {
    fn from(c: PaymentCategory) -> Self {
        c.as_str().to_string()
    }
}

/// Backend payment lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Created,
    #[serde(rename = "INPROGRESS")]
    InProgress,
    /// Kept for records written before `Created`/`InProgress` existed.
    Pending,
    Completed,
    PendingRefund,
    Refunded,
    Cancelled,
    Expired,
}

impl PaymentStatus {
    /// Returns true if transitioning from self to `next` is valid.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Created, InProgress)
                | (Created, Pending)
                | (Created, Completed)
                | (Created, Cancelled)
                | (Created, Expired)
                | (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (InProgress, Completed)
                | (InProgress, PendingRefund)
                | (Completed, PendingRefund)
                | (PendingRefund, Refunded)
        )
    }

    /// Still waiting for someone to pay.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Created | PaymentStatus::Pending)
    }
}

/// A transfer intent tracked by reference id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub reference_id: Option<ReferenceId>,
    #[serde(rename = "type", default)]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub category: PaymentCategory,
    /// Fixed network, if any.
    #[serde(rename = "chainId", default)]
    pub network: Option<Network>,
    /// Fixed token id, if any.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_amount: Option<f64>,
    #[serde(default)]
    pub usd_amount: Option<f64>,
    #[serde(default)]
    pub receiver_address: Option<Address>,
    #[serde(default)]
    pub receiver_fid: Option<u64>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub hash: Option<TxHash>,
    #[serde(default)]
    pub fulfillment_id: Option<String>,
    #[serde(default)]
    pub fulfillment_chain_id: Option<Network>,
    #[serde(default)]
    pub fulfillment_hash: Option<TxHash>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Payment {
    /// Token amount in base units for a token with `decimals`, rounded at
    /// the token's precision since the backend sends it as a float.
    pub fn token_amount_units(&self, decimals: u8) -> Option<Result<U256, UnitsError>> {
        self.token_amount
            .map(|amount| parse_units_rounded(&amount.to_string(), decimals))
    }

    /// Apply a backend update locally.
    pub fn apply(&mut self, update: &PaymentUpdate) {
        if let Some(hash) = &update.hash {
            self.hash = Some(hash.clone());
        }
        if let Some(id) = &update.fulfillment_id {
            self.fulfillment_id = Some(id.clone());
        }
        if let Some(chain) = update.fulfillment_chain_id {
            self.fulfillment_chain_id = Some(chain);
        }
        if let Some(hash) = &update.fulfillment_hash {
            self.fulfillment_hash = Some(hash.clone());
        }
        if let Some(amount) = update.token_amount {
            self.token_amount = Some(amount);
        }
        if let Some(comment) = &update.comment {
            self.comment = Some(comment.clone());
        }
    }
}

/// Body of the backend's payment update call. Absent fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_chain_id: Option<Network>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_hash: Option<TxHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl PaymentUpdate {
    pub fn with_hash(hash: TxHash) -> Self {
        Self {
            hash: Some(hash),
            ..Default::default()
        }
    }
}

/// Payflow service commission in USD shown next to routed payments.
pub fn commission_usd(payment: Option<&Payment>) -> f64 {
    match payment {
        Some(p) if p.category == PaymentCategory::FcStorage => match p.token_amount {
            Some(units) => 0.5 + (units - 1.0) * 0.1,
            None => 0.5,
        },
        _ => 0.05,
    }
}
