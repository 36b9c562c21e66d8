use anyhow::{Context, Result};

use pharmachat_core::agent::AgentGateway as _;
use pharmachat_core::patient::Patient;

use super::utils;

pub fn render_patient_line(patient: &Patient) -> String {
    let mut line = format!("{:<8} {:<24}", patient.patient_id, patient.patient_name);
    if !patient.patient_email.is_empty() {
        line.push_str(&format!(" {}", patient.patient_email));
    }
    line.trim_end().to_string()
}

pub async fn list() -> Result<()> {
    let gateway = utils::connect()?;
    let patients = gateway
        .patients()
        .await
        .context("Failed to fetch patients")?;

    if patients.is_empty() {
        println!("No patients found.");
        return Ok(());
    }
    for patient in &patients {
        println!("{}", render_patient_line(patient));
    }
    println!("\n💡 Start a conversation with: pharmachat chat --patient-id <ID>");
    Ok(())
}
