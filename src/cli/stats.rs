use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::settings::Settings;
use crate::store;

use super::open_store;

pub fn run(settings: &Settings) -> Result<()> {
    let conn = open_store(settings)?;
    let stats = store::stats(&conn)?;

    if stats.total_items == 0 {
        println!("No purchases imported yet. Run `purchases import amazon -f <file>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["", "Count"]);
    table.add_row(vec![Cell::new("Items"), Cell::new(stats.total_items)]);
    table.add_row(vec![Cell::new("Orders"), Cell::new(stats.total_orders)]);
    table.add_row(vec![Cell::new("Exported".green()), Cell::new(stats.exported)]);
    table.add_row(vec![Cell::new("Pending"), Cell::new(stats.pending)]);
    table.add_row(vec![Cell::new("Digital".dimmed()), Cell::new(stats.digital)]);
    table.add_row(vec![Cell::new("Consumable".dimmed()), Cell::new(stats.consumable)]);
    println!("{table}");
    println!("Total spent: {}", money(stats.total_spent, None).bold());

    let mut by_category = Table::new();
    by_category.set_header(vec!["Category", "Items"]);
    for (category, n) in &stats.by_category {
        let label = if category.is_tracked() {
            category.as_str().cyan()
        } else {
            category.as_str().normal()
        };
        by_category.add_row(vec![Cell::new(label), Cell::new(n)]);
    }
    println!("\nBy category\n{by_category}");

    Ok(())
}
