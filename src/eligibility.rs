//! Export eligibility. Computed on demand and never persisted, so a changed
//! threshold or rule applies to historical records on the next run.

use std::fmt;

use rust_decimal::Decimal;

use crate::models::PurchaseRecord;

pub const DEFAULT_PRICE_THRESHOLD: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Digital,
    Consumable,
    TrackedCategory,
    PriceThreshold,
    BelowThreshold,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digital => "digital",
            Self::Consumable => "consumable",
            Self::TrackedCategory => "tracked_category",
            Self::PriceThreshold => "price_threshold",
            Self::BelowThreshold => "below_threshold",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Qualifies(Reason),
    Excluded(Reason),
}

impl Eligibility {
    pub fn qualifies(&self) -> bool {
        matches!(self, Self::Qualifies(_))
    }

    pub fn reason(&self) -> Reason {
        match self {
            Self::Qualifies(r) | Self::Excluded(r) => *r,
        }
    }
}

/// Decide whether `record` belongs in the vault.
///
/// Digital and consumable exclusions are absolute and win over every
/// inclusion rule.
pub fn evaluate(record: &PurchaseRecord, price_threshold: Decimal) -> Eligibility {
    if record.is_digital {
        Eligibility::Excluded(Reason::Digital)
    } else if record.is_consumable {
        Eligibility::Excluded(Reason::Consumable)
    } else if record.category.is_tracked() {
        Eligibility::Qualifies(Reason::TrackedCategory)
    } else if record.price >= price_threshold {
        Eligibility::Qualifies(Reason::PriceThreshold)
    } else {
        Eligibility::Excluded(Reason::BelowThreshold)
    }
}
