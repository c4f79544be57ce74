use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;

use crate::error::{PurchasesError, Result};
use crate::exporter::{self, ExportRun};
use crate::settings::{expand_home, Settings};
use crate::vault::ObsidianVault;

use super::list::pending_table;
use super::open_store;

pub fn run(
    settings: &Settings,
    min_price: Option<Decimal>,
    dry_run: bool,
    yes: bool,
    vault: Option<&str>,
) -> Result<()> {
    let vault_root = vault
        .map(expand_home)
        .or_else(|| settings.vault_path.clone())
        .ok_or(PurchasesError::NoVault)?;
    let threshold = min_price.unwrap_or(settings.price_threshold);

    let conn = open_store(settings)?;
    let plan = exporter::plan(&conn, threshold)?;
    if plan.is_empty() {
        println!("No items pending export.");
        return Ok(());
    }

    println!("{}", pending_table(&plan.records, plan.threshold));
    println!("{} items to export to {}", plan.len(), vault_root.display());

    let confirm = if dry_run || yes {
        true
    } else {
        Confirm::new()
            .with_prompt(format!("Export {} items?", plan.len()))
            .default(false)
            .interact()
            .unwrap_or(false)
    };

    let mut writer = ObsidianVault::new(&vault_root);
    let result = exporter::execute(&conn, &plan, &mut writer, confirm, dry_run)?;

    match result.run {
        ExportRun::DryRun => println!("{}", "Dry run: nothing written.".yellow()),
        ExportRun::Declined => println!("Aborted."),
        ExportRun::Executed => {
            for (_, path) in &result.written {
                println!("  {} {}", "wrote".green(), path.display());
            }
            for (identity, reason) in &result.failed {
                eprintln!("  {} {identity}: {reason}", "failed".red());
            }
            println!(
                "Exported {} items to {} ({} failed, {} already exported)",
                result.written.len(),
                writer.assets_dir().display(),
                result.failed.len(),
                result.skipped.len()
            );
        }
    }

    Ok(())
}
