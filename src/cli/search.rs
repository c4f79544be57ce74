use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::{money, truncate};
use crate::settings::Settings;
use crate::store::{self, RecordFilter};

use super::open_store;

pub fn run(settings: &Settings, filter: RecordFilter) -> Result<()> {
    let conn = open_store(settings)?;
    let mut matches = store::scan(&conn, |r| filter.matches(r)).collect::<Result<Vec<_>>>()?;

    if matches.is_empty() {
        println!("No matching purchases.");
        return Ok(());
    }
    matches.sort_by(|a, b| b.purchase_date.cmp(&a.purchase_date).then_with(|| a.identity.cmp(&b.identity)));

    let mut table = Table::new();
    table.set_header(vec!["Date", "Name", "Price", "Order", "Identity"]);
    for r in &matches {
        table.add_row(vec![
            Cell::new(r.purchase_date),
            Cell::new(truncate(&r.name, 50)),
            Cell::new(money(r.price, r.currency.as_deref())),
            Cell::new(&r.order_id),
            Cell::new(&r.identity),
        ]);
    }
    println!("{table}");
    println!("{} matches", matches.len());
    Ok(())
}
