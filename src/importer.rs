use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use csv::StringRecord;
use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::categorizer::Classifier;
use crate::error::{PurchasesError, Result};
use crate::models::{Category, PurchaseRecord, UpsertMode, UpsertOutcome, VENDOR_AMAZON};
use crate::store;

// ---------------------------------------------------------------------------
// Row errors
// ---------------------------------------------------------------------------

/// Why a single row could not be turned into a record. The import continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("unparsable price '{0}'")]
    InvalidPrice(String),
    #[error("negative price '{0}'")]
    NegativePrice(String),
    #[error("unparsable date '{0}'")]
    InvalidDate(String),
    #[error("unparsable quantity '{0}'")]
    InvalidQuantity(String),
    #[error("malformed row: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportError {
    /// 1-based position of the line after the header row. Repeated header
    /// lines inside the file count toward it.
    pub row: usize,
    pub reason: RowError,
}

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub rows_seen: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped_duplicate: usize,
    pub failed: Vec<ImportError>,
    pub digital: usize,
    pub consumable: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub previously_imported: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a price such as `€1,284.69` into an exact amount plus the currency
/// implied by its symbol.
pub fn parse_price(raw: &str) -> std::result::Result<(Decimal, Option<&'static str>), RowError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RowError::MissingField("price"));
    }
    let currency = if raw.contains('€') {
        Some("EUR")
    } else if raw.contains('$') {
        Some("USD")
    } else if raw.contains('£') {
        Some("GBP")
    } else {
        None
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | ',') && !c.is_whitespace())
        .collect();
    let price = Decimal::from_str(&cleaned).map_err(|_| RowError::InvalidPrice(raw.to_string()))?;
    if price < Decimal::ZERO {
        return Err(RowError::NegativePrice(raw.to_string()));
    }
    Ok((price, currency))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_quantity(raw: &str) -> std::result::Result<u32, RowError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(1);
    }
    match raw.parse::<u32>() {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(RowError::InvalidQuantity(raw.to_string())),
    }
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    OrderId,
    Name,
    Price,
    Date,
    Category,
    Quantity,
    Sku,
    ItemUrl,
    OrderUrl,
}

// (column, required, recognized header names)
const COLUMN_SYNONYMS: &[(Column, bool, &[&str])] = &[
    (Column::OrderId, true, &["order id", "order_id", "orderid", "order", "order number", "bestellnummer"]),
    (Column::Name, true, &["description", "title", "item name", "product name", "name", "beschreibung"]),
    (Column::Price, true, &["price", "item total", "unit price", "amount", "preis"]),
    (Column::Date, true, &["order date", "date", "purchase date", "bestelldatum"]),
    (Column::Category, false, &["category", "merchant category", "kategorie"]),
    (Column::Quantity, false, &["quantity", "qty", "menge"]),
    (Column::Sku, false, &["asin", "asin/isbn", "sku"]),
    (Column::ItemUrl, false, &["item url", "product url"]),
    (Column::OrderUrl, false, &["order url"]),
];

fn column_label(column: Column) -> &'static str {
    match column {
        Column::OrderId => "order id",
        Column::Name => "name",
        Column::Price => "price",
        Column::Date => "date",
        Column::Category => "category",
        Column::Quantity => "quantity",
        Column::Sku => "sku",
        Column::ItemUrl => "item url",
        Column::OrderUrl => "order url",
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

struct HeaderMap {
    positions: HashMap<Column, usize>,
    order_header: String,
}

impl HeaderMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = HashMap::new();
        for (column, required, synonyms) in COLUMN_SYNONYMS {
            let found = synonyms
                .iter()
                .find_map(|syn| normalized.iter().position(|h| h == syn));
            match found {
                Some(idx) => {
                    positions.insert(*column, idx);
                }
                None if *required => return Err(PurchasesError::MissingColumn(column_label(*column))),
                None => {}
            }
        }
        let order_header = normalized[positions[&Column::OrderId]].clone();
        Ok(Self {
            positions,
            order_header,
        })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Column) -> &'r str {
        self.positions
            .get(&column)
            .and_then(|&idx| record.get(idx))
            .map(str::trim)
            .unwrap_or("")
    }

    fn is_repeated_header(&self, record: &StringRecord) -> bool {
        normalize_header(self.get(record, Column::OrderId)) == self.order_header
    }
}

// ---------------------------------------------------------------------------
// Import sources: enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImportSource {
    Amazon,
}

impl ImportSource {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Amazon => "Amazon order history",
        }
    }

    pub fn vendor(&self) -> &'static str {
        match self {
            Self::Amazon => VENDOR_AMAZON,
        }
    }
}

const ALL_SOURCES: &[ImportSource] = &[ImportSource::Amazon];

pub fn get_by_key(key: &str) -> Option<ImportSource> {
    ALL_SOURCES.iter().find(|s| s.key() == key).copied()
}

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

struct RowContext<'a> {
    source: ImportSource,
    classifier: &'a Classifier,
    default_currency: Option<&'a str>,
    // Line position of each order's items within the file, for rows without a SKU.
    positions: HashMap<String, usize>,
}

impl RowContext<'_> {
    fn normalize(&mut self, map: &HeaderMap, row: &StringRecord) -> std::result::Result<PurchaseRecord, RowError> {
        let order_id = map.get(row, Column::OrderId);
        if order_id.is_empty() {
            return Err(RowError::MissingField("order id"));
        }
        let position = self.positions.entry(order_id.to_string()).or_insert(0);
        *position += 1;
        let position = *position;

        let name = map.get(row, Column::Name);
        if name.is_empty() {
            return Err(RowError::MissingField("name"));
        }
        let (price, detected_currency) = parse_price(map.get(row, Column::Price))?;
        let raw_date = map.get(row, Column::Date);
        if raw_date.is_empty() {
            return Err(RowError::MissingField("date"));
        }
        let purchase_date = parse_date(raw_date).ok_or_else(|| RowError::InvalidDate(raw_date.to_string()))?;
        let quantity = parse_quantity(map.get(row, Column::Quantity))?;

        let merchant_category = non_empty(map.get(row, Column::Category));
        let sku = non_empty(map.get(row, Column::Sku));
        let item_url = non_empty(map.get(row, Column::ItemUrl));
        let order_url = non_empty(map.get(row, Column::OrderUrl));

        let vendor = self.source.vendor();
        let identity = match &sku {
            Some(sku) => format!("{vendor}:{order_id}:{sku}"),
            None => format!("{vendor}:{order_id}:#{position}"),
        };

        let classification = self
            .classifier
            .classify(name, merchant_category.as_deref(), item_url.as_deref());

        Ok(PurchaseRecord {
            identity,
            order_id: order_id.to_string(),
            vendor: vendor.to_string(),
            name: name.to_string(),
            merchant_category,
            category: classification.category,
            price,
            currency: detected_currency
                .or(self.default_currency)
                .map(str::to_string),
            quantity,
            purchase_date,
            sku,
            order_url,
            item_url,
            is_digital: classification.is_digital,
            is_consumable: classification.is_consumable,
            exported_at: None,
        })
    }
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

pub struct ImportOptions<'a> {
    pub source: ImportSource,
    pub mode: UpsertMode,
    pub default_currency: Option<&'a str>,
}

/// Import every row of `reader` into the store.
///
/// Bad rows are collected in the summary and skipped; storage failures abort.
pub fn import_csv<R: Read>(
    conn: &Connection,
    reader: R,
    classifier: &Classifier,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let map = HeaderMap::from_headers(&headers)?;

    let mut ctx = RowContext {
        source: options.source,
        classifier,
        default_currency: options.default_currency,
        positions: HashMap::new(),
    };
    let mut summary = ImportSummary::default();

    for (index, result) in rdr.records().enumerate() {
        let ordinal = index + 1;
        let parsed = match result {
            Ok(row) if map.is_repeated_header(&row) => continue,
            Ok(row) => ctx.normalize(&map, &row),
            Err(e) => Err(RowError::Malformed(e.to_string())),
        };
        summary.rows_seen += 1;

        let record = match parsed {
            Ok(record) => record,
            Err(reason) => {
                warn!(row = ordinal, %reason, "skipping row");
                summary.failed.push(ImportError { row: ordinal, reason });
                continue;
            }
        };

        if record.is_digital {
            summary.digital += 1;
        }
        if record.is_consumable {
            summary.consumable += 1;
        }
        *summary.by_category.entry(record.category).or_default() += 1;

        let outcome = store::upsert(conn, &record, options.mode)?;
        debug!(identity = %record.identity, ?outcome, "upserted");
        match outcome {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
            UpsertOutcome::Skipped => summary.skipped_duplicate += 1,
        }
    }

    Ok(summary)
}

fn checksum_seen(conn: &Connection, checksum: &str) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM imports WHERE checksum = ?1")?;
    Ok(stmt.exists([checksum])?)
}

pub fn import_file(
    conn: &Connection,
    file_path: &Path,
    classifier: &Classifier,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let checksum = compute_checksum(file_path)?;
    let previously_imported = checksum_seen(conn, &checksum)?;
    if previously_imported {
        warn!(file = %file_path.display(), "file was imported before; relying on row dedup");
    }

    info!(file = %file_path.display(), source = options.source.key(), mode = ?options.mode, "importing");
    let file = std::fs::File::open(file_path)?;
    let mut summary = import_csv(conn, std::io::BufReader::new(file), classifier, options)?;
    summary.previously_imported = previously_imported;

    conn.execute(
        "INSERT INTO imports (filename, source, checksum, rows_seen, inserted, updated, skipped, failed) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            options.source.key(),
            checksum,
            summary.rows_seen as i64,
            summary.inserted as i64,
            summary.updated as i64,
            summary.skipped_duplicate as i64,
            summary.failed.len() as i64,
        ],
    )?;
    info!(
        rows = summary.rows_seen,
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped_duplicate,
        failed = summary.failed.len(),
        "import finished"
    );

    Ok(summary)
}
