//! Chat message model.

use serde::{Deserialize, Serialize};

use crate::agent::{ChatResponse, ExtractionResult, OrderPreview, SafetyCheckResult};
use crate::order::Order;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the patient.
    User,
    /// Message from the agent backend.
    Assistant,
}

/// Structured payload attached to an assistant message.
///
/// Mirrors the gateway's chat response minus the text, plus the one mutable
/// flag the UI is allowed to flip in place once a prescription upload is
/// satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessagePayload {
    #[serde(default)]
    pub extracted_entities: Option<ExtractionResult>,
    #[serde(default)]
    pub safety_result: Option<SafetyCheckResult>,
    #[serde(default)]
    pub order_preview: Option<OrderPreview>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub trace_url: Option<String>,
    #[serde(default)]
    pub requires_confirmation: bool,
    /// Flipped once the patient uploads the required prescription.
    #[serde(default)]
    pub prescription_uploaded: bool,
}

impl MessagePayload {
    /// Extracts the structured payload from a gateway chat response.
    ///
    /// Returns `None` when the response carries no structured data at all,
    /// so plain conversational turns stay payload-free.
    pub fn from_response(response: &ChatResponse) -> Option<Self> {
        if response.extracted_entities.is_none()
            && response.safety_result.is_none()
            && response.order_preview.is_none()
            && response.order.is_none()
            && response.trace_url.is_none()
            && response.badges.is_empty()
            && !response.requires_confirmation
        {
            return None;
        }
        Some(Self {
            extracted_entities: response.extracted_entities.clone(),
            safety_result: response.safety_result.clone(),
            order_preview: response.order_preview.clone(),
            order: response.order.clone(),
            badges: response.badges.clone(),
            trace_url: response.trace_url.clone(),
            requires_confirmation: response.requires_confirmation,
            prescription_uploaded: false,
        })
    }
}

/// A single message in a conversation log.
///
/// Immutable once appended, except for marking an order-preview message's
/// prescription-upload flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Monotonic per-session id.
    pub id: u64,
    pub role: MessageRole,
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
}

impl ChatMessage {
    /// Creates a plain user message stamped with the current time.
    pub fn user(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload: None,
        }
    }

    /// Creates an assistant message carrying an optional structured payload.
    pub fn assistant(id: u64, content: impl Into<String>, payload: Option<MessagePayload>) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            payload,
        }
    }
}
