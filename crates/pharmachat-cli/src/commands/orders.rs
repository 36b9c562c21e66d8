use anyhow::{Context, Result};

use pharmachat_core::agent::AgentGateway as _;

use super::{render, utils};

pub async fn list(patient_id: Option<&str>) -> Result<()> {
    let gateway = utils::connect()?;
    let orders = gateway
        .orders(patient_id)
        .await
        .context("Failed to fetch orders")?;

    if orders.is_empty() {
        println!("No orders found.");
        return Ok(());
    }
    for order in &orders {
        println!("{}", render::render_order_line(order));
    }
    Ok(())
}

pub async fn show(order_id: &str) -> Result<()> {
    let gateway = utils::connect()?;
    let order = gateway
        .order(order_id)
        .await
        .with_context(|| format!("Failed to fetch order {order_id}"))?;
    print!("{}", render::render_order(&order));
    Ok(())
}
