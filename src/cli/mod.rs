pub mod config;
pub mod export;
pub mod import;
pub mod list;
pub mod migrate;
pub mod reset_export;
pub mod search;
pub mod stats;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::db;
use crate::error::Result;
use crate::settings::Settings;

/// Open the configured database, creating it on first use.
pub(crate) fn open_store(settings: &Settings) -> Result<rusqlite::Connection> {
    db::open(&settings.db_path)
}

#[derive(Parser)]
#[command(
    name = "purchases",
    version,
    about = "Import online purchase history and export notable items to an Obsidian vault."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show resolved paths and settings.
    Config,
    /// Import a purchase history CSV.
    Import {
        /// Import source key (e.g. amazon)
        source: String,
        /// Path to the CSV export
        #[arg(short, long)]
        file: String,
        /// Refresh fields of records that already exist
        #[arg(short, long)]
        update: bool,
    },
    /// Show database statistics.
    Stats,
    /// List items eligible for export.
    List {
        /// Price threshold (default: from settings, 100)
        #[arg(long = "min-price")]
        min_price: Option<Decimal>,
        /// Include exported and ineligible items
        #[arg(long)]
        all: bool,
    },
    /// Find records by date or amount.
    Search {
        /// Exact purchase date: YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Exact unit price
        #[arg(long)]
        amount: Option<Decimal>,
        /// Earliest purchase date: YYYY-MM-DD
        #[arg(long = "from")]
        from_date: Option<NaiveDate>,
        /// Latest purchase date: YYYY-MM-DD
        #[arg(long = "to")]
        to_date: Option<NaiveDate>,
    },
    /// Write notes for eligible items to the vault.
    Export {
        /// Price threshold (default: from settings, 100)
        #[arg(long = "min-price")]
        min_price: Option<Decimal>,
        /// Show what would be exported without writing
        #[arg(short = 'n', long = "dry-run")]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Vault root (default: VAULT_PATH or settings)
        #[arg(short, long)]
        vault: Option<String>,
    },
    /// Copy an existing database to the configured location.
    Migrate {
        /// Path to the old database
        source: String,
        /// Overwrite an existing database at the destination
        #[arg(short, long)]
        force: bool,
    },
    /// Mark an exported record as pending again.
    ResetExport {
        /// Record identity (e.g. amazon:123-4567890-1234567:B0ABC12345)
        identity: String,
    },
}
