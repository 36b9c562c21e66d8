//! Order domain model.
//!
//! Orders are created by the fulfillment backend and mutated only by
//! status-changing webhooks there; the client never writes them.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Coarse order lifecycle status as persisted by the backend.
///
/// Monotonically non-decreasing along the canonical stage order, except the
/// terminal `Blocked` and `Cancelled` states which freeze progression.
/// Unknown strings deserialize to `Unknown` so a stale client never fails
/// on a status it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Validated,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Blocked,
    Cancelled,
    /// Fail-soft bucket for statuses this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// True for states that freeze lifecycle progression.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Blocked | Self::Cancelled)
    }
}

/// A single line item on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub medicine_id: String,
    pub medicine_name: String,
    #[serde(default)]
    pub strength: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub prescription_required: bool,
}

/// One raw event from the backend's authoritative order event log.
///
/// When present, these take precedence over synthetic timeline derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderEvent {
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Internal-only events are never shown to the end customer.
    #[serde(default)]
    pub internal: bool,
}

/// An order as returned by `GET /api/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Order {
    pub order_id: String,
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_email: String,
    #[serde(default)]
    pub patient_phone: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Backend subtotal, pre-tax and pre-delivery-fee.
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    /// ISO 8601 last-update timestamp.
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub prescription_id: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
    /// Raw authoritative event log, when the backend supplies one.
    #[serde(default)]
    pub timeline: Vec<OrderEvent>,
}
