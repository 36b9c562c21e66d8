use anyhow::{Context, Result};

use pharmachat_core::agent::AgentGateway as _;

use super::utils;

pub async fn list() -> Result<()> {
    let gateway = utils::connect()?;
    let medicines = gateway
        .inventory()
        .await
        .context("Failed to fetch inventory")?;

    if medicines.is_empty() {
        println!("Inventory is empty.");
        return Ok(());
    }
    for medicine in &medicines {
        let mut flags = Vec::new();
        if medicine.prescription_required {
            flags.push("Rx");
        }
        if medicine.controlled_substance {
            flags.push("controlled");
        }
        if medicine.discontinued {
            flags.push("discontinued");
        }
        println!(
            "{:<10} {:<28} {:<8} stock: {:>5}  {}",
            medicine.medicine_id,
            medicine.medicine_name,
            medicine.strength,
            medicine.stock_level,
            flags.join(", ")
        );
    }
    Ok(())
}

pub async fn stats() -> Result<()> {
    let gateway = utils::connect()?;
    let stats = gateway
        .inventory_stats()
        .await
        .context("Failed to fetch inventory statistics")?;

    println!("Total SKUs:            {}", stats.total_skus);
    println!("Unique medicines:      {}", stats.unique_medicines);
    println!("Out of stock:          {}", stats.out_of_stock);
    println!("Low stock:             {}", stats.low_stock);
    println!("Prescription required: {}", stats.prescription_required);
    println!("Discontinued:          {}", stats.discontinued);
    Ok(())
}
