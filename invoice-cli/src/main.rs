//! Invoice CLI
//!
//! Command-line interface for the invoice automator's HTTP triggers.

use anyhow::Result;
use clap::{Parser, Subcommand};

use invoice_client::InvoiceClient;

#[derive(Parser)]
#[command(name = "invoice")]
#[command(author, version, about = "Invoice automator CLI client", long_about = None)]
struct Cli {
    /// Base URL of the invoice server
    #[arg(long, env = "INVOICE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Trigger token for protected endpoints
    #[arg(long, env = "TRIGGER_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// Generate and send this month's invoice now
    Trigger,
    /// Fetch and cache today's exchange rate
    Precache,
    /// Run the server-side connection test
    Test,
    /// Show the invoice sequence and cached rate
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = InvoiceClient::new(&cli.api_url);
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Health => match client.health().await {
            Ok(health) => println!("✓ {} is {}", health.service, health.status),
            Err(e) => {
                println!("✗ API is not healthy: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Trigger => {
            let response = client.trigger().await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Precache => {
            let outcome = client.precache().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_cached() {
                std::process::exit(1);
            }
        }

        Commands::Test => {
            let report = client.test_connections().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Status => {
            let status = client.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
