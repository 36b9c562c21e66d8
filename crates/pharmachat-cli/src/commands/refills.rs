use anyhow::{Context, Result};

use pharmachat_core::agent::{AgentGateway as _, RefillAction, RefillUrgency};

use super::utils;

fn urgency_label(urgency: RefillUrgency) -> &'static str {
    match urgency {
        RefillUrgency::Low => "low",
        RefillUrgency::Medium => "medium",
        RefillUrgency::High => "high",
        RefillUrgency::Critical => "CRITICAL",
    }
}

fn action_label(action: RefillAction) -> &'static str {
    match action {
        RefillAction::Remind => "remind",
        RefillAction::AutoRefill => "auto-refill",
        RefillAction::Block => "block",
    }
}

pub async fn list() -> Result<()> {
    let gateway = utils::connect()?;
    let predictions = gateway
        .refills()
        .await
        .context("Failed to fetch refill predictions")?;

    if predictions.is_empty() {
        println!("No refill predictions right now.");
        return Ok(());
    }
    for prediction in &predictions {
        println!(
            "{:<8} {:<24} {:<20} {:>3} days left  [{}] {}",
            prediction.patient_id,
            prediction.patient_name,
            prediction.medicine,
            prediction.days_remaining,
            urgency_label(prediction.urgency),
            action_label(prediction.action)
        );
        if !prediction.justification.is_empty() {
            println!("         {}", prediction.justification);
        }
    }
    Ok(())
}
