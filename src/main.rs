mod categorizer;
mod cli;
mod db;
mod eligibility;
mod error;
mod exporter;
mod fmt;
mod importer;
mod migrate;
mod models;
mod settings;
mod store;
mod vault;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use settings::Settings;
use store::RecordFilter;

const LOG_ENV: &str = "PURCHASES_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = Settings::resolve().and_then(|settings| match cli.command {
        Commands::Config => cli::config::run(&settings),
        Commands::Import { source, file, update } => cli::import::run(&settings, &source, &file, update),
        Commands::Stats => cli::stats::run(&settings),
        Commands::List { min_price, all } => cli::list::run(&settings, min_price, all),
        Commands::Search {
            date,
            amount,
            from_date,
            to_date,
        } => cli::search::run(
            &settings,
            RecordFilter {
                on_date: date,
                amount,
                from_date,
                to_date,
            },
        ),
        Commands::Export {
            min_price,
            dry_run,
            yes,
            vault,
        } => cli::export::run(&settings, min_price, dry_run, yes, vault.as_deref()),
        Commands::Migrate { source, force } => cli::migrate::run(&settings, &source, force),
        Commands::ResetExport { identity } => cli::reset_export::run(&settings, &identity),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
