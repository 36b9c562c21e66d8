//! Agent gateway capability trait.

use async_trait::async_trait;

use super::types::{ChatRequest, ChatResponse, RefillPrediction, VoiceRequest, VoiceResponse};
use crate::error::Result;
use crate::inventory::{InventoryStats, Medicine};
use crate::order::Order;
use crate::patient::Patient;

/// The external service boundary fronting all LLM-driven decision-making.
///
/// The session coordinator depends only on this trait; the HTTP
/// implementation lives in the gateway crate and tests substitute mocks.
/// Every call must complete within a bounded timeout so a wedged backend
/// cannot leave a session stuck in flight.
#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Sends one conversation turn through the agent pipeline.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Transcribes audio, runs the chat pipeline on the transcript, and
    /// optionally returns synthesized response audio.
    async fn voice(&self, request: VoiceRequest) -> Result<VoiceResponse>;

    /// Lists all patients known to the backend.
    async fn patients(&self) -> Result<Vec<Patient>>;

    /// Fetches a single patient by id.
    async fn patient(&self, patient_id: &str) -> Result<Patient>;

    /// Lists orders, optionally filtered to one patient. Each order may
    /// carry its raw event log.
    async fn orders(&self, patient_id: Option<&str>) -> Result<Vec<Order>>;

    /// Fetches a single order by id.
    async fn order(&self, order_id: &str) -> Result<Order>;

    /// Lists the full medicine inventory.
    async fn inventory(&self) -> Result<Vec<Medicine>>;

    /// Aggregate inventory statistics.
    async fn inventory_stats(&self) -> Result<InventoryStats>;

    /// Proactive refill predictions across all patients.
    async fn refills(&self) -> Result<Vec<RefillPrediction>>;
}
