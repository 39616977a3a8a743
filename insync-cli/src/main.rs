use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insync_client::{
    fetch_balances, fetch_loyalty_status, fetch_operations, fetch_package_info, login, Session,
};
use insync_core::reconcile;
use std::path::PathBuf;

mod config;
mod export;
mod state;

#[derive(Parser, Debug)]
#[command(name = "insync", version, about = "CLI client for the InSync bank web API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the operation history and print or export the reconciled ledger
    History {
        /// Number of operations to fetch
        #[arg(long, short, default_value_t = 50)]
        items: usize,

        /// Export to a spreadsheet (CSV) instead of printing; optional path
        #[arg(long, short, num_args = 0..=1, default_missing_value = export::DEFAULT_EXPORT_PATH)]
        export: Option<PathBuf>,
    },

    /// Show account balances
    Balance,

    /// Show package subscription status and free-service conditions
    Package,

    /// Show loyalty program bonus balance
    Loyalty,

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file to ~/.insync/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::History { items, export } => {
            let session = connect().await?;
            history(&session, items, export).await?;
        }
        Command::Balance => {
            let session = connect().await?;
            balance(&session).await?;
        }
        Command::Package => {
            let session = connect().await?;
            package(&session).await?;
        }
        Command::Loyalty => {
            let session = connect().await?;
            loyalty(&session).await?;
        }
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },
    }

    Ok(())
}

async fn connect() -> Result<Session> {
    let creds = config::resolve_credentials()?;
    login(&creds).await
}

async fn history(session: &Session, items: usize, export: Option<PathBuf>) -> Result<()> {
    println!("Fetching {items} history items...");
    let operations = fetch_operations(session, items).await?;
    let rows = reconcile(&operations).context("reconciling operation history")?;
    println!("Fetched {} operations, {} ledger rows\n", operations.len(), rows.len());

    match export {
        Some(path) => {
            export::write_csv(&rows, &path)?;
            println!("Wrote {}", path.display());
        }
        None => export::print_table(&rows),
    }
    Ok(())
}

async fn balance(session: &Session) -> Result<()> {
    let balances = fetch_balances(session).await?;
    println!("=== Account balances ===");
    for b in &balances {
        println!("{:<25} {:>12.2} {}", b.title, b.amount, b.currency);
    }
    Ok(())
}

async fn package(session: &Session) -> Result<()> {
    let info = fetch_package_info(session).await?;
    println!("=== Package ===");
    println!("Title   : {}", info.package_info.title);
    println!("Status  : {}", info.package_info.status.name);
    println!("Payment : {}", info.package_info.payment_description);

    println!("\n=== Conditions for free service ===");
    println!("{}", info.conditions_title);
    println!("{}\n", info.conditions_description);
    for cond in &info.conditions {
        let mark = if cond.percent >= 1.0 { "[ok]" } else { "[..]" };
        println!(
            "{mark} {:<30} {:.2}/{:.2} {}",
            cond.text,
            cond.current_value.amount,
            cond.end_value.amount,
            cond.current_value.postfix.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn loyalty(session: &Session) -> Result<()> {
    let status = fetch_loyalty_status(session).await?;
    println!("=== Loyalty program ===");
    println!(
        "Connected : {}",
        if status.is_connected { "yes" } else { "no" }
    );
    println!(
        "Balance   : {} {}",
        status.bonus_amount.amount, status.bonus_amount.postfix
    );
    Ok(())
}
