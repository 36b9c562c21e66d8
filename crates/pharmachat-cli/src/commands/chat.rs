//! Interactive chat loop against the agent backend.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write as _};
use std::sync::Arc;

use pharmachat_application::{SendOutcome, SessionCoordinator};
use pharmachat_core::agent::AgentGateway as _;
use pharmachat_core::patient::Patient;
use pharmachat_core::session::{MessageRole, SessionStore};
use pharmachat_infrastructure::JsonSessionStore;

use super::{render, utils};

pub async fn run(patient_id: Option<String>, name: Option<String>) -> Result<()> {
    let gateway = utils::connect()?;
    let store = Arc::new(
        JsonSessionStore::default_location()
            .await
            .context("Failed to open the session store")?,
    );

    let patient_id = match patient_id {
        Some(id) => id,
        None => store
            .last_selected_patient()
            .await
            .context("Failed to read the last selected patient")?
            .context("No previous patient found; pass --patient-id")?,
    };
    let patient = match name {
        Some(name) => Patient::new(patient_id.clone(), name),
        // No name given: ask the backend, falling back to the bare id.
        None => match gateway.patient(&patient_id).await {
            Ok(patient) => patient,
            Err(e) => {
                tracing::debug!("patient lookup failed ({e}); using the id as display name");
                Patient::new(patient_id.clone(), patient_id.clone())
            }
        },
    };

    let coordinator = SessionCoordinator::new(gateway.clone(), store);
    coordinator.select_patient(patient).await;

    let history = coordinator.messages().await;
    if !history.is_empty() {
        println!("📜 Resuming {} earlier messages:", history.len());
        for message in &history {
            let prefix = match message.role {
                MessageRole::User => "you",
                MessageRole::Assistant => "agent",
            };
            println!("  [{prefix}] {}", message.content);
        }
        println!();
    }

    println!("💬 Chatting as {patient_id}. Type 'exit' to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        let seen = coordinator.messages().await.len();
        if coordinator.send_text(input).await == SendOutcome::Rejected {
            continue;
        }
        print_new_replies(&coordinator, seen).await;
    }

    println!("👋 Session saved. Goodbye!");
    Ok(())
}

/// Prints every assistant message appended since `seen`, including any
/// structured payload it carries.
async fn print_new_replies(coordinator: &SessionCoordinator, seen: usize) {
    let messages = coordinator.messages().await;
    for message in messages.iter().skip(seen) {
        if message.role != MessageRole::Assistant {
            continue;
        }
        println!("{}", message.content);
        let Some(payload) = &message.payload else {
            continue;
        };
        if let Some(preview) = &payload.order_preview {
            print!("{}", render::render_preview(preview));
        }
        if let Some(order) = &payload.order {
            print!("{}", render::render_order(order));
        }
        if let Some(trace_url) = &payload.trace_url {
            tracing::debug!(%trace_url, "agent trace available");
        }
    }
}
