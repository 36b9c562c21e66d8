//! Plain-text rendering of orders, timelines, and previews.

use std::fmt::Write;

use pharmachat_core::agent::OrderPreview;
use pharmachat_core::order::{Order, StepStatus, derive_timeline, pricing};

fn step_symbol(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "✓",
        StepStatus::Current => "●",
        StepStatus::Pending => "○",
        StepStatus::Blocked => "✗",
    }
}

/// Renders the customer-facing status timeline for one order.
pub fn render_timeline(order: &Order) -> String {
    let mut out = String::new();
    for step in derive_timeline(order) {
        let timestamp = step.timestamp.as_deref().unwrap_or("");
        let _ = writeln!(
            out,
            "  {} {:<24} {:<32} {}",
            step_symbol(step.status),
            step.title,
            step.agent_name,
            timestamp
        );
        if step.status == StepStatus::Blocked && !step.description.is_empty() {
            let _ = writeln!(out, "      {}", step.description);
        }
    }
    out
}

/// One-line order summary for list output.
pub fn render_order_line(order: &Order) -> String {
    format!(
        "{}  {:<10}  {:>8}  {}",
        order.order_id,
        order.status.to_string(),
        format!("${:.2}", pricing::display_total(order.total_amount)),
        order.created_at
    )
}

/// Full order detail block: header, items, total, and timeline.
pub fn render_order(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Order {}", order.order_id);
    let _ = writeln!(out, "Patient: {} ({})", order.patient_name, order.patient_id);
    let _ = writeln!(out, "Status:  {}", order.status);
    for item in &order.items {
        let _ = writeln!(
            out,
            "  - {} {} x{}  ${:.2}",
            item.medicine_name, item.strength, item.quantity, item.unit_price
        );
    }
    let _ = writeln!(
        out,
        "Total (incl. tax and delivery): ${:.2}",
        pricing::display_total(order.total_amount)
    );
    let _ = writeln!(out, "\nTimeline:");
    out.push_str(&render_timeline(order));
    out
}

/// Renders an unconfirmed order preview, as returned by the chat agent.
pub fn render_preview(preview: &OrderPreview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📋 Order preview {}", preview.preview_id);
    for item in &preview.items {
        let _ = writeln!(
            out,
            "  - {} {} x{}  ${:.2}",
            item.medicine_name, item.strength, item.quantity, item.unit_price
        );
    }
    let _ = writeln!(
        out,
        "Total (incl. tax and delivery): ${:.2}",
        pricing::display_total(preview.total_amount)
    );
    if preview.requires_prescription {
        let _ = writeln!(out, "⚠️  A prescription upload is required.");
    }
    for reason in &preview.safety_reasons {
        let _ = writeln!(out, "  • {}", reason);
    }
    let _ = writeln!(out, "Type 'confirm' to place the order or 'cancel' to discard it.");
    out
}
