mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::appeal::{DecisionArgs, ReconcileArgs, TaxSavingsArgs};
use commands::valuation::{CostArgs, IncomeArgs, SalesArgs};

/// Three-approach real-estate valuation calculations
#[derive(Parser)]
#[command(
    name = "apr",
    version,
    about = "Three-approach real-estate valuation calculations",
    long_about = "A CLI for the appraisal valuation engine with decimal precision. \
                  Supports the sales comparison, income capitalization, and cost \
                  approaches, weighted reconciliation, and appeal tax-savings \
                  analysis. Each result carries a confidence score, rationale, \
                  and accumulated validation errors."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a property from weighted, adjusted comparable sales
    SalesComparison(SalesArgs),
    /// Value a property from its NOI build-up and cap rate (optional DCF)
    Income(IncomeArgs),
    /// Value a property as land plus depreciated replacement cost
    Cost(CostArgs),
    /// Reconcile the three approach indications into a final value
    Reconcile(ReconcileArgs),
    /// Compute appeal tax savings from an assessment reduction
    TaxSavings(TaxSavingsArgs),
    /// Classify an assessment as OVER/FAIR/UNDER and size the appeal
    Decision(DecisionArgs),
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
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::SalesComparison(args) => commands::valuation::run_sales_comparison(args),
        Commands::Income(args) => commands::valuation::run_income(args),
        Commands::Cost(args) => commands::valuation::run_cost(args),
        Commands::Reconcile(args) => commands::appeal::run_reconcile(args),
        Commands::TaxSavings(args) => commands::appeal::run_tax_savings(args),
        Commands::Decision(args) => commands::appeal::run_decision(args),
        Commands::Version => {
            println!("apr {}", env!("CARGO_PKG_VERSION"));
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
