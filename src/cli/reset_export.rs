use crate::error::{PurchasesError, Result};
use crate::settings::Settings;
use crate::store;

use super::open_store;

pub fn run(settings: &Settings, identity: &str) -> Result<()> {
    let conn = open_store(settings)?;
    let record = store::find_by_identity(&conn, identity)?
        .ok_or_else(|| PurchasesError::Other(format!("No record with identity {identity}")))?;

    if !record.is_exported() {
        println!("{} is not exported; nothing to reset.", record.name);
        return Ok(());
    }
    store::clear_exported(&conn, identity)?;
    println!("{} will be exported again on the next run.", record.name);
    Ok(())
}
