//! REST client for the Payflow backend.

use payflow_common::flow::{Flow, FlowWallet};
use payflow_common::payment::{Payment, PaymentUpdate, ReferenceId};
use payflow_common::services::{FlowService, PaymentService, ServiceError};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::config::ClientConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPayment {
    reference_id: ReferenceId,
}

/// HTTP implementation of the payment and flow services.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, ServiceError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        check_status(response.status(), what)?;
        Ok(response)
    }
}

fn check_status(status: StatusCode, what: &str) -> Result<(), ServiceError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(ServiceError::NotFound(what.to_string()))
    } else if status == StatusCode::BAD_REQUEST {
        Err(ServiceError::Invalid(what.to_string()))
    } else {
        tracing::debug!(status = status.as_u16(), "{what}: unexpected status");
        Err(ServiceError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}

impl PaymentService for HttpBackend {
    async fn create_payment(&self, payment: &Payment) -> Result<ReferenceId, ServiceError> {
        let request = self
            .client
            .post(self.config.endpoint("/api/payment"))
            .json(payment);
        let created: CreatedPayment = self
            .send(request, "payment")
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        tracing::info!(reference_id = %created.reference_id, "payment created");
        Ok(created.reference_id)
    }

    async fn get_payment(&self, reference_id: &ReferenceId) -> Result<Payment, ServiceError> {
        let request = self
            .client
            .get(self.config.endpoint(&format!("/api/payment/{reference_id}")));
        self.send(request, &format!("payment {reference_id}"))
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn update_payment(
        &self,
        reference_id: &ReferenceId,
        update: &PaymentUpdate,
    ) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.config.endpoint(&format!("/api/payment/{reference_id}")))
            .json(update);
        self.send(request, &format!("payment {reference_id}")).await?;
        Ok(())
    }

    async fn cancel_payment(&self, reference_id: &ReferenceId) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.config.endpoint(&format!("/api/payment/{reference_id}/cancel")))
            .json(&serde_json::json!({}));
        self.send(request, &format!("payment {reference_id}")).await?;
        Ok(())
    }
}

impl FlowService for HttpBackend {
    async fn create_flow(&self, flow: &Flow) -> Result<(), ServiceError> {
        let request = self.client.post(self.config.endpoint("/api/flows")).json(flow);
        let response = self.send(request, "flow").await?;
        if response.status() != StatusCode::CREATED {
            return Err(ServiceError::UnexpectedStatus {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn set_default_receiving_flow(&self, flow_uuid: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.config.endpoint(&format!("/api/flows/receiving/{flow_uuid}")))
            .json(&serde_json::json!({}));
        self.send(request, &format!("flow {flow_uuid}")).await?;
        Ok(())
    }

    async fn update_wallet(
        &self,
        flow_uuid: &str,
        wallet: &FlowWallet,
    ) -> Result<(), ServiceError> {
        let request = self
            .client
            .put(self.config.endpoint(&format!("/api/flows/{flow_uuid}/wallet")))
            .json(wallet);
        self.send(request, &format!("flow {flow_uuid}")).await?;
        Ok(())
    }

    async fn archive_flow(&self, flow_uuid: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .patch(self.config.endpoint(&format!("/api/flows/{flow_uuid}/archive")))
            .json(&serde_json::json!({}));
        self.send(request, &format!("flow {flow_uuid}")).await?;
        Ok(())
    }

    async fn rename_flow(&self, flow_uuid: &str, title: &str) -> Result<(), ServiceError> {
        let request = self
            .client
            .patch(self.config.endpoint(&format!("/api/flows/{flow_uuid}/title")))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(title.to_string());
        self.send(request, &format!("flow {flow_uuid}")).await?;
        Ok(())
    }
}
