//! Wire types for the agent gateway.
//!
//! These mirror the backend's response schemas field for field; every
//! structured payload is optional because the orchestrating agent decides
//! per turn what to attach.

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderItem};

/// Decision made by the safety & prescription policy agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyDecision {
    #[default]
    Approve,
    Reject,
    Conditional,
}

/// Action recommended by the refill intelligence agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefillAction {
    #[default]
    Remind,
    AutoRefill,
    Block,
}

/// Urgency grade attached to a refill prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefillUrgency {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// One medicine mention extracted from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractedEntity {
    #[serde(default)]
    pub medicine: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub raw_text: String,
}

/// Output of the conversational extraction agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub needs_clarification: bool,
    #[serde(default)]
    pub clarification_message: String,
}

/// Output of the safety policy agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SafetyCheckResult {
    #[serde(default)]
    pub decision: SafetyDecision,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub allowed_quantity: Option<u32>,
    #[serde(default)]
    pub requires_followup: bool,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub blocked_items: Vec<String>,
}

/// An order assembled by the agents but not yet confirmed by the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPreview {
    pub preview_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub safety_decision: SafetyDecision,
    #[serde(default)]
    pub safety_reasons: Vec<String>,
    #[serde(default)]
    pub requires_prescription: bool,
    #[serde(default)]
    pub created_at: String,
}

/// A proactive refill suggestion for one patient/medicine pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillPrediction {
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    pub medicine: String,
    #[serde(default)]
    pub medicine_id: String,
    #[serde(default)]
    pub days_remaining: i64,
    #[serde(default)]
    pub last_purchase_date: String,
    #[serde(default)]
    pub action: RefillAction,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub urgency: RefillUrgency,
}

/// One prior turn sent back to the gateway as conversation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// `POST /api/chat` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub patient_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Prior turns only; the current message travels in `message`.
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
}

/// `POST /api/chat` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extracted_entities: Option<ExtractionResult>,
    #[serde(default)]
    pub safety_result: Option<SafetyCheckResult>,
    #[serde(default)]
    pub order_preview: Option<OrderPreview>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub refill_suggestions: Vec<RefillPrediction>,
    #[serde(default)]
    pub trace_url: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// `POST /api/voice` request body. Audio travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceRequest {
    pub audio_base64: String,
    pub patient_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl VoiceRequest {
    /// Builds a voice request from raw audio bytes.
    pub fn from_audio(
        audio: &[u8],
        patient_id: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        use base64::Engine as _;
        Self {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio),
            patient_id: patient_id.into(),
            session_id,
        }
    }

}

/// `POST /api/voice` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VoiceResponse {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub chat_response: ChatResponse,
    #[serde(default)]
    pub audio_response_base64: Option<String>,
}

impl VoiceResponse {
    /// Decodes the synthesized response audio; `None` when absent or not
    /// valid base64.
    pub fn decode_audio(&self) -> Option<Vec<u8>> {
        use base64::Engine as _;
        let encoded = self.audio_response_base64.as_deref()?;
        base64::engine::general_purpose::STANDARD.decode(encoded).ok()
    }
}
