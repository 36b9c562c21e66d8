//! Timeline derivation for order lifecycle display.
//!
//! Maps an order's coarse status (or its raw event log, when the backend
//! supplies one) to the ordered sequence of customer-facing lifecycle
//! steps. Pure and deterministic; malformed input degrades to best-effort
//! labels instead of failing.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use super::model::{Order, OrderEvent, OrderStatus};

/// Display status of a single timeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
    Blocked,
}

/// One customer-visible lifecycle milestone, derived per render.
///
/// Never persisted; callers may memoize but the contract is a fresh
/// derivation from the current [`Order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    /// Stable step key ("requested", "safety", ...).
    pub key: String,
    pub title: String,
    pub description: String,
    /// Name of the agent attributed with this step.
    pub agent_name: String,
    /// ISO 8601 timestamp; `None` for stages not yet reached.
    pub timestamp: Option<String>,
    pub status: StepStatus,
}

/// The six canonical lifecycle stages in display order.
const STAGES: [(&str, &str, &str, &str); 6] = [
    (
        "requested",
        "Order Requested",
        "Order initiated via conversation",
        "Conversational Ordering Agent",
    ),
    (
        "safety",
        "AI Safety Validation",
        "Prescription verified and approved",
        "Safety & Policy Agent",
    ),
    (
        "confirmed",
        "AI Order Confirmed",
        "AI validated and confirmed order",
        "Safety & Policy Agent",
    ),
    (
        "fulfillment",
        "Fulfillment Initiated",
        "Warehouse notified for fulfillment",
        "Inventory & Fulfillment Agent",
    ),
    (
        "dispatched",
        "Dispatched",
        "Package dispatched for delivery",
        "Warehouse System",
    ),
    (
        "delivered",
        "Delivered",
        "Order delivered to patient",
        "Warehouse System",
    ),
];

/// Minutes added to the order's creation time per reached stage when no
/// authoritative event log is available. Display detail, not contract.
const SYNTHETIC_STAGE_OFFSET_MINUTES: i64 = 2;

/// Event actions the backend records for bookkeeping only; never shown.
const INTERNAL_ACTIONS: [&str; 1] = ["Inventory Updated"];

/// Stage pointer for a coarse status: the index of the stage currently in
/// progress. Everything before the pointer has happened; an index past the
/// end means every stage is done.
fn stage_pointer(status: OrderStatus) -> usize {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::Validated => 1,
        OrderStatus::Confirmed => 2,
        OrderStatus::Processing => 4,
        OrderStatus::Shipped => 5,
        OrderStatus::Delivered => 6,
        OrderStatus::Blocked => 1,
        OrderStatus::Cancelled => 0,
        OrderStatus::Unknown => 0,
    }
}

/// Derives the customer-facing status timeline for an order.
///
/// A non-empty event log on the order takes precedence and is mapped
/// verbatim (minus internal-only events). Otherwise six synthetic steps are
/// emitted, tagged relative to the status's stage pointer, except `Blocked`
/// which short-circuits to exactly two steps since no further processing
/// occurred.
pub fn derive_timeline(order: &Order) -> Vec<TimelineStep> {
    let visible_events: Vec<&OrderEvent> = order
        .timeline
        .iter()
        .filter(|e| !is_internal_event(e))
        .collect();

    if !visible_events.is_empty() {
        return visible_events.into_iter().map(event_to_step).collect();
    }

    if order.status == OrderStatus::Blocked {
        return blocked_timeline(order);
    }

    let pointer = stage_pointer(order.status);
    STAGES
        .iter()
        .enumerate()
        .map(|(index, (key, title, description, agent))| {
            let status = if index < pointer {
                StepStatus::Completed
            } else if index == pointer {
                StepStatus::Current
            } else {
                StepStatus::Pending
            };
            let timestamp = if index <= pointer {
                synthetic_timestamp(&order.created_at, index)
            } else {
                None
            };
            TimelineStep {
                key: (*key).to_string(),
                title: (*title).to_string(),
                description: (*description).to_string(),
                agent_name: (*agent).to_string(),
                timestamp,
                status,
            }
        })
        .collect()
}

/// Blocked orders show the request plus the block, nothing downstream.
fn blocked_timeline(order: &Order) -> Vec<TimelineStep> {
    let (key, title, description, agent) = STAGES[0];
    vec![
        TimelineStep {
            key: key.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            agent_name: agent.to_string(),
            timestamp: synthetic_timestamp(&order.created_at, 0),
            status: StepStatus::Completed,
        },
        TimelineStep {
            key: "blocked".to_string(),
            title: "Blocked by AI".to_string(),
            description: "Blocked: safety check failed".to_string(),
            agent_name: "Safety & Policy Agent".to_string(),
            timestamp: synthetic_timestamp(&order.created_at, 1),
            status: StepStatus::Blocked,
        },
    ]
}

fn is_internal_event(event: &OrderEvent) -> bool {
    event.internal || INTERNAL_ACTIONS.contains(&event.action.as_str())
}

/// Maps one raw backend event to a display step, labeling best-effort when
/// fields are missing.
fn event_to_step(event: &OrderEvent) -> TimelineStep {
    let title = if !event.action.trim().is_empty() {
        event.action.clone()
    } else if !event.description.trim().is_empty() {
        event.description.clone()
    } else {
        "Processing Step".to_string()
    };

    let status = match event.status.to_ascii_lowercase().as_str() {
        "current" => StepStatus::Current,
        "pending" => StepStatus::Pending,
        "blocked" => StepStatus::Blocked,
        // "completed", empty, and anything unrecognized render as done
        _ => StepStatus::Completed,
    };

    TimelineStep {
        key: slugify(&title),
        title,
        description: event.description.clone(),
        agent_name: if event.agent_name.is_empty() {
            "Pharmacy System".to_string()
        } else {
            event.agent_name.clone()
        },
        timestamp: event.timestamp.clone(),
        status,
    }
}

/// created_at plus a fixed per-stage offset; `None` when created_at is not
/// parseable rather than failing the derivation.
fn synthetic_timestamp(created_at: &str, stage_index: usize) -> Option<String> {
    let base: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(created_at).ok()?;
    let offset = Duration::minutes(SYNTHETIC_STAGE_OFFSET_MINUTES * stage_index as i64);
    Some((base + offset).to_rfc3339())
}

fn slugify(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
