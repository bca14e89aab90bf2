mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::amortization::AmortizationArgs;
use commands::evaluate::EvaluateArgs;
use commands::export::ExportArgs;
use output::OutputFormat;

/// Rental property investment evaluation
#[derive(Parser)]
#[command(
    name = "peval",
    version,
    about = "Rental property investment evaluation",
    long_about = "Evaluates a leveraged rental property purchase with decimal precision: \
                  mortgage amortization, conservative/base/optimistic cash-flow projections, \
                  ROI, cap rate, DSCR, cash-on-cash return, break-even and IRR."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (.json, .yaml or .yml)
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an investment and print the dashboard response
    Evaluate(EvaluateArgs),
    /// Print the loan amortization schedule
    Amortization(AmortizationArgs),
    /// Write the yearly projection (and optionally the amortization schedule) as CSV
    Export(ExportArgs),
    /// Print version information
    Version,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PEVAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("peval {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let engine = match config::load(cli.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args, &engine),
        Commands::Amortization(args) => commands::amortization::run_amortization(args, &engine),
        Commands::Export(args) => commands::export::run_export(args, &engine),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            cli.output.render(&value);
            let rejected = value.get("success") == Some(&Value::Bool(false));
            process::exit(if rejected { 1 } else { 0 });
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
