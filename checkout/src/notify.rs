use std::sync::atomic::{AtomicU64, Ordering};

use payflow_common::address::{self, Address};
use payflow_common::chain::Network;
use payflow_common::transaction::TxHash;
use serde::{Deserialize, Serialize};

/// Handle of one loading notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

/// What a transfer toast shows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub from: Address,
    pub to: Option<Address>,
    pub network: Network,
    pub token: String,
    pub usd_amount: Option<f64>,
    pub hash: Option<TxHash>,
}

/// UI notifications (toasts). A loading handle is created once per submission
/// and resolved exactly once by `success`, `error` or `dismiss`.
pub trait Notifier {
    fn loading(&self, summary: &TransferSummary) -> NotificationId;

    fn success(&self, id: NotificationId, summary: &TransferSummary);

    /// `message` is the classified user-facing reason.
    fn error(&self, id: NotificationId, summary: &TransferSummary, message: &str);

    /// Drop a loading notification without an outcome (user rejection).
    fn dismiss(&self, id: NotificationId);
}

/// Notifier that reports toasts as log events.
#[derive(Debug, Default)]
pub struct TracingNotifier {
    next: AtomicU64,
}

impl Notifier for TracingNotifier {
    fn loading(&self, summary: &TransferSummary) -> NotificationId {
        let id = NotificationId(self.next.fetch_add(1, Ordering::Relaxed));
        tracing::info!(
            notification = id.0,
            from = %address::short(&summary.from),
            network = %summary.network,
            token = %summary.token,
            "payment pending"
        );
        id
    }

    fn success(&self, id: NotificationId, summary: &TransferSummary) {
        let hash = summary.hash.as_ref().map(|h| h.to_string()).unwrap_or_default();
        tracing::info!(notification = id.0, tx_hash = %hash, "payment confirmed");
    }

    fn error(&self, id: NotificationId, _summary: &TransferSummary, message: &str) {
        tracing::warn!(notification = id.0, "payment failed: {message}");
    }

    fn dismiss(&self, id: NotificationId) {
        tracing::debug!(notification = id.0, "notification dismissed");
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn loading(&self, summary: &TransferSummary) -> NotificationId {
        (**self).loading(summary)
    }

    fn success(&self, id: NotificationId, summary: &TransferSummary) {
        (**self).success(id, summary)
    }

    fn error(&self, id: NotificationId, summary: &TransferSummary, message: &str) {
        (**self).error(id, summary, message)
    }

    fn dismiss(&self, id: NotificationId) {
        (**self).dismiss(id)
    }
}
