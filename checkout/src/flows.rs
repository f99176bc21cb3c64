use payflow_common::flow::{Flow, FlowWallet};
use payflow_common::services::{FlowService, ServiceError};

/// Flow management on top of a [`FlowService`], with local validation
/// before anything is sent.
pub struct FlowManager<S> {
    service: S,
}

impl<S: FlowService> FlowManager<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn create(&self, flow: &Flow) -> Result<(), ServiceError> {
        if flow.title.trim().is_empty() {
            return Err(ServiceError::Invalid("flow title is empty".into()));
        }
        if !flow.has_unique_networks() {
            return Err(ServiceError::Invalid(
                "flow has more than one wallet per network".into(),
            ));
        }
        self.service.create_flow(flow).await?;
        tracing::info!(flow = %flow.uuid, kind = flow.kind.label(), "flow created");
        Ok(())
    }

    /// Make `flow` the profile's default receiving flow.
    pub async fn set_receiving(&self, flow: &Flow) -> Result<(), ServiceError> {
        if flow.archived {
            return Err(ServiceError::Invalid(
                "archived flow cannot receive payments".into(),
            ));
        }
        self.service.set_default_receiving_flow(&flow.uuid).await
    }

    pub async fn rename(&self, flow: &mut Flow, title: &str) -> Result<(), ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::Invalid("flow title is empty".into()));
        }
        if flow.title == title {
            return Ok(());
        }
        self.service.rename_flow(&flow.uuid, title).await?;
        flow.title = title.to_string();
        Ok(())
    }

    pub async fn archive(&self, flow: &mut Flow) -> Result<(), ServiceError> {
        if flow.archived {
            return Ok(());
        }
        self.service.archive_flow(&flow.uuid).await?;
        flow.archived = true;
        tracing::info!(flow = %flow.uuid, "flow archived");
        Ok(())
    }

    /// Persist a wallet change, e.g. the first-deployment flag.
    pub async fn update_wallet(&self, flow: &Flow, wallet: &FlowWallet) -> Result<(), ServiceError> {
        if flow.wallet_on(wallet.network).is_none() {
            return Err(ServiceError::NotFound(format!(
                "wallet on {} in flow {}",
                wallet.network, flow.uuid
            )));
        }
        self.service.update_wallet(&flow.uuid, wallet).await
    }
}
