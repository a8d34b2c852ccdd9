mod commands;
mod input;
mod output;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::escrow::EscrowArgs;
use commands::mortgage::{MortgageArgs, ScheduleArgs, TrackerArgs};

/// Mortgage amortization, payment tracking and property escrow
#[derive(Parser)]
#[command(
    name = "pledger",
    version,
    about = "Mortgage amortization, payment tracking and property escrow",
    long_about = "A CLI for the property marketplace ledger: amortized mortgage \
                  analysis and payment schedules in whole currency units, \
                  next-payment tracking for backend mortgage records, and the \
                  buyer-protection escrow state machine."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Evaluate as of this instant instead of the current time (RFC 3339)
    #[arg(long, global = true)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full mortgage analysis: payment, totals and schedule
    Mortgage(MortgageArgs),
    /// Generate the payment schedule only
    Schedule(ScheduleArgs),
    /// Summarise backend mortgage records: next payment, upcoming and overdue
    Tracker(TrackerArgs),
    /// Drive an escrow transaction through its lifecycle
    Escrow(EscrowArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("PROPLEDGER_LOG", "warn"))
        .init();

    let cli = Cli::parse();
    let now = cli.as_of.unwrap_or_else(Utc::now);
    log::debug!("evaluating as of {now}");

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Mortgage(args) => commands::mortgage::run_mortgage(args, now),
        Commands::Schedule(args) => commands::mortgage::run_schedule(args, now),
        Commands::Tracker(args) => commands::mortgage::run_tracker(args, now),
        Commands::Escrow(args) => commands::escrow::run_escrow(args, now),
        Commands::Version => {
            println!("pledger {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
