//! HTTP implementation of the agent gateway.
//!
//! Talks to the pharmacy agent backend's REST API. Every request carries a
//! bounded timeout; transport failures and non-2xx statuses map to
//! `PharmaError::Gateway` with a retryable classification so callers can
//! distinguish a flaky backend from a rejected request.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use pharmachat_core::agent::{
    AgentGateway, ChatRequest, ChatResponse, RefillPrediction, VoiceRequest, VoiceResponse,
};
use pharmachat_core::config::GatewayConfig;
use pharmachat_core::error::Result;
use pharmachat_core::inventory::{InventoryStats, Medicine};
use pharmachat_core::order::Order;
use pharmachat_core::patient::Patient;
use pharmachat_core::PharmaError;

/// Agent gateway backed by the backend's REST API.
#[derive(Clone)]
pub struct HttpAgentGateway {
    client: Client,
    base_url: String,
}

impl HttpAgentGateway {
    /// Creates a gateway client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PharmaError::config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<R> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_response(response).await
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_response(response).await
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        tracing::debug!(
            patient_id = %request.patient_id,
            history_len = request.conversation_history.len(),
            "sending chat turn to gateway"
        );
        self.post_json("/api/chat", &request).await
    }

    async fn voice(&self, request: VoiceRequest) -> Result<VoiceResponse> {
        tracing::debug!(patient_id = %request.patient_id, "sending voice turn to gateway");
        self.post_json("/api/voice", &request).await
    }

    async fn patients(&self) -> Result<Vec<Patient>> {
        self.get_json("/api/patients", &[]).await
    }

    async fn patient(&self, patient_id: &str) -> Result<Patient> {
        self.get_json(&format!("/api/patients/{patient_id}"), &[]).await
    }

    async fn orders(&self, patient_id: Option<&str>) -> Result<Vec<Order>> {
        let query: Vec<(&str, &str)> = match patient_id {
            Some(id) => vec![("patient_id", id)],
            None => vec![],
        };
        self.get_json("/api/orders", &query).await
    }

    async fn order(&self, order_id: &str) -> Result<Order> {
        self.get_json(&format!("/api/orders/{order_id}"), &[]).await
    }

    async fn inventory(&self) -> Result<Vec<Medicine>> {
        self.get_json("/api/inventory", &[]).await
    }

    async fn inventory_stats(&self) -> Result<InventoryStats> {
        self.get_json("/api/inventory/stats", &[]).await
    }

    async fn refills(&self) -> Result<Vec<RefillPrediction>> {
        self.get_json("/api/refills", &[]).await
    }
}

fn map_transport_error(err: reqwest::Error) -> PharmaError {
    if err.is_connect() || err.is_timeout() {
        PharmaError::gateway_retryable(format!("gateway request failed: {err}"))
    } else {
        PharmaError::gateway(format!("gateway request failed: {err}"))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn decode_response<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read gateway error body".to_string());
        let message = extract_detail(&body).unwrap_or(body);
        return Err(PharmaError::Gateway {
            message: format!("gateway returned {status}: {message}"),
            retryable: is_retryable_status(status),
        });
    }

    // Malformed success bodies are surfaced as gateway errors; the session
    // layer treats them exactly like transport failures.
    response
        .json::<R>()
        .await
        .map_err(|err| PharmaError::gateway(format!("failed to parse gateway response: {err}")))
}

/// FastAPI error bodies look like `{"detail": "..."}`.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(|s| s.to_string())
}
