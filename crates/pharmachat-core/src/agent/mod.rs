//! Agent gateway boundary.
//!
//! All LLM-driven decision-making (entity extraction, safety policy,
//! refill prediction, fulfillment) lives behind a remote agent backend.
//! This module defines the wire types that cross that boundary and the
//! [`AgentGateway`] capability trait the session coordinator depends on.

mod gateway;
mod types;

pub use gateway::AgentGateway;
pub use types::{
    ChatRequest, ChatResponse, ExtractedEntity, ExtractionResult, HistoryEntry, OrderPreview,
    RefillAction, RefillPrediction, RefillUrgency, SafetyCheckResult, SafetyDecision,
    VoiceRequest, VoiceResponse,
};
