pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use shelfrank_core::config::{AppConfig, LoadOptions};
use shelfrank_core::recommend::Focus;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shelfrank",
    about = "Shelfrank recommendation CLI",
    long_about = "Rank catalog products from sales history, stock and product text, and operate the backing SQLite database.",
    after_help = "Examples:\n  shelfrank seed\n  shelfrank recommend --focus online --limit 5\n  shelfrank doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Compute the ranked recommendation list for every catalog product")]
    Recommend {
        #[arg(long, default_value = "all", help = "Channel to favour: online, otc or all")]
        focus: String,
        #[arg(long, help = "Only print the first N ranked products")]
        limit: Option<usize>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic stationery demo dataset")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, DB connectivity and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let logging_config = AppConfig::load(LoadOptions::default())
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging);
    logging::init(&logging_config);

    let result = match cli.command {
        Command::Recommend { focus, limit, json } => {
            commands::recommend::run(Focus::parse(&focus), limit, json)
        }
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
