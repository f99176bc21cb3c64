use std::sync::Mutex;

use payflow_common::address::Address;
use payflow_common::chain::Network;
use payflow_common::flow::{Flow, FlowKind, FlowWallet};
use payflow_common::services::{
    SmartAccountTransfer, SmartAccountTransferRequest, TransactionSender, WalletClient,
    WalletError,
};
use payflow_common::transaction::{ChainTransaction, TransactionRequest, TxHash};

/// Signs calls for one flow wallet, choosing the path by flow kind.
///
/// Smart-account flows go through the smart-account kit with the flow's owner
/// config, salt and version; every other flow is sent directly by the
/// connected signer. Used for direct transfers and as the signing callback of
/// routing sessions.
pub struct FlowSender<'a, W> {
    client: &'a W,
    flow: &'a Flow,
    identity: &'a Address,
    source: &'a FlowWallet,
    on_hash: &'a (dyn Fn(&TxHash) + 'a),
    last_hash: Mutex<Option<TxHash>>,
}

impl<'a, W> FlowSender<'a, W>
where
    W: WalletClient + SmartAccountTransfer,
{
    pub fn new(
        client: &'a W,
        flow: &'a Flow,
        identity: &'a Address,
        source: &'a FlowWallet,
        on_hash: &'a (dyn Fn(&TxHash) + 'a),
    ) -> Self {
        Self {
            client,
            flow,
            identity,
            source,
            on_hash,
            last_hash: Mutex::new(None),
        }
    }

    /// Hash of the most recent call this sender broadcast.
    pub fn last_hash(&self) -> Option<TxHash> {
        self.last_hash
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn send_call(
        &self,
        network: Network,
        call: &TransactionRequest,
    ) -> Result<TxHash, WalletError> {
        if self.client.active_network() != Some(network) {
            tracing::debug!(%network, "switching network for routed call");
            self.client.switch_network(network).await?;
        }

        let hash = match &self.flow.kind {
            FlowKind::Regular { salt_nonce, .. } | FlowKind::Jar { salt_nonce } => {
                let request = SmartAccountTransferRequest {
                    account: self.source.address,
                    network,
                    owners: self.flow.owner_config(self.identity),
                    salt_nonce: salt_nonce.clone(),
                    version: self.source.version_or_default().to_string(),
                    call: call.clone(),
                };
                self.client.transfer(&request).await?
            }
            FlowKind::FarcasterVerification
            | FlowKind::Linked
            | FlowKind::Bankr
            | FlowKind::Rodeo => self.client.send_transaction(network, call).await?,
        };

        tracing::info!(
            tx_hash = %hash,
            %network,
            flow = self.flow.kind.label(),
            "transaction broadcast"
        );
        *self.last_hash.lock().unwrap_or_else(|e| e.into_inner()) = Some(hash.clone());
        (self.on_hash)(&hash);
        Ok(hash)
    }
}

impl<W> TransactionSender for FlowSender<'_, W>
where
    W: WalletClient + SmartAccountTransfer,
{
    async fn send_transaction(&self, tx: &ChainTransaction) -> Result<TxHash, WalletError> {
        self.send_call(tx.network, &tx.request).await
    }
}
