use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub const VENDOR_AMAZON: &str = "amazon";

/// Closed set of semantic categories a record can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    ThreeDPrinting,
    Electronics,
    Tools,
    Kitchen,
    SmartHome,
    Golf,
    Games,
    Clothing,
    Furniture,
    RentalProperty,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::ThreeDPrinting,
        Category::Electronics,
        Category::Tools,
        Category::Kitchen,
        Category::SmartHome,
        Category::Golf,
        Category::Games,
        Category::Clothing,
        Category::Furniture,
        Category::RentalProperty,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeDPrinting => "3d-printing",
            Self::Electronics => "electronics",
            Self::Tools => "tools",
            Self::Kitchen => "kitchen",
            Self::SmartHome => "smart-home",
            Self::Golf => "golf",
            Self::Games => "games",
            Self::Clothing => "clothing",
            Self::Furniture => "furniture",
            Self::RentalProperty => "rental-property",
            Self::Other => "other",
        }
    }

    pub fn is_tracked(&self) -> bool {
        *self != Self::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One normalized purchase line item.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseRecord {
    pub identity: String,
    pub order_id: String,
    pub vendor: String,
    pub name: String,
    pub merchant_category: Option<String>,
    pub category: Category,
    pub price: Decimal,
    pub currency: Option<String>,
    pub quantity: u32,
    pub purchase_date: NaiveDate,
    pub sku: Option<String>,
    pub order_url: Option<String>,
    pub item_url: Option<String>,
    pub is_digital: bool,
    pub is_consumable: bool,
    pub exported_at: Option<DateTime<Utc>>,
}

impl PurchaseRecord {
    pub fn is_exported(&self) -> bool {
        self.exported_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    InsertOrSkip,
    InsertOrUpdate,
}

impl UpsertMode {
    pub fn from_update_flag(update: bool) -> Self {
        if update {
            Self::InsertOrUpdate
        } else {
            Self::InsertOrSkip
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyExported,
    NotFound,
}
