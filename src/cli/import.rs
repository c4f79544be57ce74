use std::path::PathBuf;

use colored::Colorize;

use crate::categorizer::Classifier;
use crate::error::{PurchasesError, Result};
use crate::importer::{get_by_key, import_file, ImportOptions};
use crate::models::UpsertMode;
use crate::settings::{expand_home, Settings};

use super::open_store;

fn previously_imported_notice(mode: UpsertMode) -> &'static str {
    match mode {
        UpsertMode::InsertOrSkip => "This file was imported before; existing rows are skipped.",
        UpsertMode::InsertOrUpdate => "This file was imported before; existing rows are refreshed.",
    }
}

pub fn run(settings: &Settings, source: &str, file: &str, update: bool) -> Result<()> {
    let source = get_by_key(source).ok_or_else(|| PurchasesError::UnknownSource(source.to_string()))?;
    let file_path: PathBuf = expand_home(file);
    if !file_path.is_file() {
        return Err(PurchasesError::Other(format!("File not found: {}", file_path.display())));
    }

    let conn = open_store(settings)?;
    let classifier = Classifier::builtin()?;
    let options = ImportOptions {
        source,
        mode: UpsertMode::from_update_flag(update),
        default_currency: settings.default_currency.as_deref(),
    };
    let summary = import_file(&conn, &file_path, &classifier, &options)?;

    if summary.previously_imported {
        println!("{}", previously_imported_notice(options.mode).yellow());
    }
    println!("Imported {} from {}", source.name(), file_path.display());
    println!("  Rows:       {}", summary.rows_seen);
    println!("  New:        {}", summary.inserted);
    if update {
        println!("  Updated:    {}", summary.updated);
    }
    println!("  Skipped:    {} (already in database)", summary.skipped_duplicate);
    println!("  Digital:    {}", summary.digital);
    println!("  Consumable: {}", summary.consumable);

    if !summary.by_category.is_empty() {
        println!();
        println!("By category:");
        for (category, n) in &summary.by_category {
            println!("  {:<14} {n}", category.as_str());
        }
    }

    if !summary.failed.is_empty() {
        println!();
        println!("{}", format!("{} rows could not be imported:", summary.failed.len()).red());
        for failure in &summary.failed {
            println!("  row {}: {}", failure.row, failure.reason);
        }
    }

    Ok(())
}
