//! Record store: the persistent table of purchase records, keyed by identity.
//!
//! Every write here is one atomic unit against SQLite, either a single
//! statement or a single transaction.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Category, MarkOutcome, PurchaseRecord, UpsertMode, UpsertOutcome};

const COLUMNS: &str = "id, identity, order_id, vendor, name, merchant_category, category, price, \
     currency, quantity, purchase_date, sku, order_url, item_url, is_digital, is_consumable, exported_at";

const SCAN_PAGE: i64 = 256;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn record_from_row(row: &Row) -> rusqlite::Result<(i64, PurchaseRecord)> {
    let category: String = row.get(6)?;
    let price: String = row.get(7)?;
    let quantity: i64 = row.get(9)?;
    let purchase_date: String = row.get(10)?;
    let exported_at: Option<String> = row.get(16)?;

    let record = PurchaseRecord {
        identity: row.get(1)?,
        order_id: row.get(2)?,
        vendor: row.get(3)?,
        name: row.get(4)?,
        merchant_category: row.get(5)?,
        category: Category::from_str(&category).map_err(|e| conversion_error(6, Type::Text, e))?,
        price: Decimal::from_str(&price).map_err(|e| conversion_error(7, Type::Text, e))?,
        currency: row.get(8)?,
        quantity: u32::try_from(quantity).map_err(|e| conversion_error(9, Type::Integer, e))?,
        purchase_date: NaiveDate::parse_from_str(&purchase_date, DATE_FORMAT)
            .map_err(|e| conversion_error(10, Type::Text, e))?,
        sku: row.get(11)?,
        order_url: row.get(12)?,
        item_url: row.get(13)?,
        is_digital: row.get(14)?,
        is_consumable: row.get(15)?,
        exported_at: exported_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| conversion_error(16, Type::Text, e))
            })
            .transpose()?,
    };
    Ok((row.get(0)?, record))
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn exists(conn: &Connection, identity: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM records WHERE identity = ?1")?;
    Ok(stmt.exists([identity])?)
}

/// Insert `record`, or resolve an identity conflict according to `mode`.
///
/// In update mode the mutable fields are overwritten; `identity` and
/// `exported_at` of the stored row are preserved.
pub fn upsert(conn: &Connection, record: &PurchaseRecord, mode: UpsertMode) -> Result<UpsertOutcome> {
    let tx = conn.unchecked_transaction()?;
    let outcome = match (exists(&tx, &record.identity)?, mode) {
        (false, _) => {
            tx.execute(
                "INSERT INTO records (identity, order_id, vendor, name, merchant_category, category, \
                 price, currency, quantity, purchase_date, sku, order_url, item_url, is_digital, \
                 is_consumable, exported_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                rusqlite::params![
                    record.identity,
                    record.order_id,
                    record.vendor,
                    record.name,
                    record.merchant_category,
                    record.category.as_str(),
                    record.price.to_string(),
                    record.currency,
                    record.quantity,
                    record.purchase_date.format(DATE_FORMAT).to_string(),
                    record.sku,
                    record.order_url,
                    record.item_url,
                    record.is_digital,
                    record.is_consumable,
                    record.exported_at.as_ref().map(timestamp),
                ],
            )?;
            UpsertOutcome::Inserted
        }
        (true, UpsertMode::InsertOrSkip) => UpsertOutcome::Skipped,
        (true, UpsertMode::InsertOrUpdate) => {
            tx.execute(
                "UPDATE records SET name = ?1, merchant_category = ?2, category = ?3, price = ?4, \
                 currency = ?5, quantity = ?6, purchase_date = ?7, sku = ?8, order_url = ?9, \
                 item_url = ?10, is_digital = ?11, is_consumable = ?12 \
                 WHERE identity = ?13",
                rusqlite::params![
                    record.name,
                    record.merchant_category,
                    record.category.as_str(),
                    record.price.to_string(),
                    record.currency,
                    record.quantity,
                    record.purchase_date.format(DATE_FORMAT).to_string(),
                    record.sku,
                    record.order_url,
                    record.item_url,
                    record.is_digital,
                    record.is_consumable,
                    record.identity,
                ],
            )?;
            UpsertOutcome::Updated
        }
    };
    tx.commit()?;
    Ok(outcome)
}

pub fn find_by_identity(conn: &Connection, identity: &str) -> Result<Option<PurchaseRecord>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {COLUMNS} FROM records WHERE identity = ?1"))?;
    let found = stmt.query_row([identity], record_from_row).optional()?;
    Ok(found.map(|(_, record)| record))
}

/// Set `exported_at` for a pending record. An existing timestamp is never overwritten.
pub fn mark_exported(conn: &Connection, identity: &str, at: DateTime<Utc>) -> Result<MarkOutcome> {
    let changed = conn.execute(
        "UPDATE records SET exported_at = ?1 WHERE identity = ?2 AND exported_at IS NULL",
        rusqlite::params![timestamp(&at), identity],
    )?;
    if changed == 1 {
        return Ok(MarkOutcome::Marked);
    }
    if exists(conn, identity)? {
        Ok(MarkOutcome::AlreadyExported)
    } else {
        Ok(MarkOutcome::NotFound)
    }
}

/// Administrative repair: return a record to the pending state.
pub fn clear_exported(conn: &Connection, identity: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE records SET exported_at = NULL WHERE identity = ?1 AND exported_at IS NOT NULL",
        [identity],
    )?;
    Ok(changed == 1)
}

pub fn count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT count(*) FROM records", [], |r| r.get(0))?)
}

/// Lazily iterate over all records matching `predicate`, in insertion order.
///
/// Rows are fetched a page at a time. Calling `scan` again starts over.
pub fn scan<P>(conn: &Connection, predicate: P) -> Scan<'_, P>
where
    P: FnMut(&PurchaseRecord) -> bool,
{
    Scan {
        conn,
        predicate,
        after_id: 0,
        buffer: VecDeque::new(),
        exhausted: false,
    }
}

pub struct Scan<'c, P> {
    conn: &'c Connection,
    predicate: P,
    after_id: i64,
    buffer: VecDeque<PurchaseRecord>,
    exhausted: bool,
}

impl<P> Scan<'_, P>
where
    P: FnMut(&PurchaseRecord) -> bool,
{
    fn fill(&mut self) -> Result<()> {
        let conn = self.conn;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM records WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;
        let rows = stmt.query_map(rusqlite::params![self.after_id, SCAN_PAGE], record_from_row)?;
        let mut fetched = 0;
        for row in rows {
            let (id, record) = row?;
            fetched += 1;
            self.after_id = id;
            if (self.predicate)(&record) {
                self.buffer.push_back(record);
            }
        }
        if fetched < SCAN_PAGE {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl<P> Iterator for Scan<'_, P>
where
    P: FnMut(&PurchaseRecord) -> bool,
{
    type Item = Result<PurchaseRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Some(Ok(record));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub total_items: i64,
    pub total_orders: i64,
    pub total_spent: Decimal,
    pub exported: i64,
    pub pending: i64,
    pub digital: i64,
    pub consumable: i64,
    pub by_category: BTreeMap<Category, i64>,
}

pub fn stats(conn: &Connection) -> Result<Stats> {
    let mut stats = Stats::default();
    let mut orders = HashSet::new();
    for record in scan(conn, |_| true) {
        let record = record?;
        stats.total_items += 1;
        stats.total_spent += record.price * Decimal::from(record.quantity);
        if record.is_exported() {
            stats.exported += 1;
        } else {
            stats.pending += 1;
        }
        if record.is_digital {
            stats.digital += 1;
        }
        if record.is_consumable {
            stats.consumable += 1;
        }
        *stats.by_category.entry(record.category).or_default() += 1;
        orders.insert(record.order_id);
    }
    stats.total_orders = orders.len() as i64;
    Ok(stats)
}

/// Filters for `search`; every set field must match.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub on_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &PurchaseRecord) -> bool {
        self.on_date.map_or(true, |d| record.purchase_date == d)
            && self.amount.map_or(true, |a| record.price == a)
            && self.from_date.map_or(true, |d| record.purchase_date >= d)
            && self.to_date.map_or(true, |d| record.purchase_date <= d)
    }
}
