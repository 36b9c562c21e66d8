use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pharmachat")]
#[command(about = "PharmaChat CLI - conversational pharmacy ordering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session with the pharmacy agent
    Chat {
        /// Patient to chat as; defaults to the last selected patient
        #[arg(long)]
        patient_id: Option<String>,
        /// Display name used when the patient is new
        #[arg(long)]
        name: Option<String>,
    },
    /// List patients known to the backend
    Patients,
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Inspect the medicine catalog
    Inventory {
        #[command(subcommand)]
        action: InventoryAction,
    },
    /// Show AI refill predictions
    Refills,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, optionally scoped to one patient
    List {
        #[arg(long)]
        patient_id: Option<String>,
    },
    /// Show one order with its status timeline
    Show { order_id: String },
}

#[derive(Subcommand)]
enum InventoryAction {
    /// List all medicines
    List,
    /// Show aggregate inventory statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { patient_id, name } => commands::chat::run(patient_id, name).await?,
        Commands::Patients => commands::patients::list().await?,
        Commands::Orders { action } => match action {
            OrdersAction::List { patient_id } => {
                commands::orders::list(patient_id.as_deref()).await?
            }
            OrdersAction::Show { order_id } => commands::orders::show(&order_id).await?,
        },
        Commands::Inventory { action } => match action {
            InventoryAction::List => commands::inventory::list().await?,
            InventoryAction::Stats => commands::inventory::stats().await?,
        },
        Commands::Refills => commands::refills::list().await?,
    }

    Ok(())
}
