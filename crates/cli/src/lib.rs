pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "stockroom",
    about = "Stockroom operator CLI",
    long_about = "Operate the stockroom database: migrations, demo data, inventory reports, config inspection and readiness checks.",
    after_help = "Examples:\n  stockroom migrate\n  stockroom report --type low_stock\n  stockroom doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo inventory (products, customers, sales)")]
    Seed,
    #[command(about = "Generate an inventory report from the configured database")]
    Report {
        #[arg(
            long = "type",
            value_name = "TYPE",
            help = "low_stock, movement_summary or category_summary"
        )]
        report_type: String,
        #[arg(long, help = "Look-back window for movement_summary (default 30)")]
        days: Option<u32>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, reasoning endpoint settings and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit the full check report as JSON")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Report { report_type, days } => commands::report::run(&report_type, days),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
