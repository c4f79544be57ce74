use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::eligibility::evaluate;
use crate::error::Result;
use crate::exporter;
use crate::fmt::{money, truncate};
use crate::models::PurchaseRecord;
use crate::settings::Settings;
use crate::store;

use super::open_store;

const NAME_WIDTH: usize = 60;

pub fn run(settings: &Settings, min_price: Option<Decimal>, all: bool) -> Result<()> {
    let conn = open_store(settings)?;
    let threshold = min_price.unwrap_or(settings.price_threshold);

    if !all {
        let plan = exporter::plan(&conn, threshold)?;
        if plan.is_empty() {
            println!("No items pending export.");
            return Ok(());
        }
        println!("{}", pending_table(&plan.records, plan.threshold));
        println!("{} items pending export (threshold {threshold})", plan.len());
        return Ok(());
    }

    let mut records = store::scan(&conn, |_| true).collect::<Result<Vec<_>>>()?;
    if records.is_empty() {
        println!("No purchases imported yet.");
        return Ok(());
    }
    records.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date).then_with(|| a.identity.cmp(&b.identity)));

    let mut table = Table::new();
    table.set_header(vec!["Date", "Name", "Category", "Price", "Eligible", "Exported"]);
    for r in &records {
        let eligibility = evaluate(r, threshold);
        let verdict = if eligibility.qualifies() {
            eligibility.reason().as_str().green()
        } else {
            eligibility.reason().as_str().dimmed()
        };
        table.add_row(vec![
            Cell::new(r.purchase_date),
            Cell::new(truncate(&r.name, NAME_WIDTH)),
            Cell::new(r.category),
            Cell::new(money(r.price, r.currency.as_deref())),
            Cell::new(verdict),
            Cell::new(r.exported_at.map(|t| t.format("%Y-%m-%d").to_string()).unwrap_or_default()),
        ]);
    }
    println!("{table}");
    println!("{} items", records.len());
    Ok(())
}

pub(crate) fn pending_table(records: &[PurchaseRecord], threshold: Decimal) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Name", "Category", "Price", "Reason"]);
    for r in records {
        table.add_row(vec![
            Cell::new(r.purchase_date),
            Cell::new(truncate(&r.name, NAME_WIDTH)),
            Cell::new(r.category),
            Cell::new(money(r.price, r.currency.as_deref())),
            Cell::new(evaluate(r, threshold).reason()),
        ]);
    }
    table
}
