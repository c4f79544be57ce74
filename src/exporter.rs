use std::path::PathBuf;

use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::eligibility::evaluate;
use crate::error::Result;
use crate::models::{MarkOutcome, PurchaseRecord};
use crate::store;
use crate::vault::VaultWriter;

/// Eligible records still waiting for a vault note, newest purchase first.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub threshold: Decimal,
    pub records: Vec<PurchaseRecord>,
}

impl ExportPlan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportRun {
    #[default]
    DryRun,
    Declined,
    Executed,
}

#[derive(Debug, Default)]
pub struct ExportResult {
    pub run: ExportRun,
    pub written: Vec<(String, PathBuf)>,
    pub failed: Vec<(String, String)>,
    /// Planned records that were already exported by the time they were reached.
    pub skipped: Vec<String>,
}

pub fn plan(conn: &Connection, threshold: Decimal) -> Result<ExportPlan> {
    let mut records = store::scan(conn, |r| !r.is_exported() && evaluate(r, threshold).qualifies())
        .collect::<Result<Vec<_>>>()?;
    records.sort_by(|a, b| {
        b.purchase_date
            .cmp(&a.purchase_date)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    Ok(ExportPlan { threshold, records })
}

/// Write a note for every planned record and mark the ones that succeeded.
///
/// Nothing is written or marked on a dry run or when `confirm` is false.
/// A failed note write is recorded and the batch moves on; a record is only
/// marked exported after its note was written.
pub fn execute<W: VaultWriter + ?Sized>(
    conn: &Connection,
    plan: &ExportPlan,
    writer: &mut W,
    confirm: bool,
    dry_run: bool,
) -> Result<ExportResult> {
    let mut result = ExportResult::default();
    if dry_run {
        result.run = ExportRun::DryRun;
        return Ok(result);
    }
    if !confirm {
        result.run = ExportRun::Declined;
        return Ok(result);
    }
    result.run = ExportRun::Executed;

    for planned in &plan.records {
        let current = match store::find_by_identity(conn, &planned.identity)? {
            Some(record) if !record.is_exported() => record,
            _ => {
                result.skipped.push(planned.identity.clone());
                continue;
            }
        };

        let path = match writer.write_note(&current) {
            Ok(path) => path,
            Err(e) => {
                warn!(identity = %current.identity, error = %e, "vault write failed");
                result.failed.push((current.identity.clone(), e.to_string()));
                continue;
            }
        };

        match store::mark_exported(conn, &current.identity, Utc::now())? {
            MarkOutcome::Marked => {}
            outcome => warn!(identity = %current.identity, ?outcome, "note written but record was not pending"),
        }
        info!(identity = %current.identity, path = %path.display(), "exported");
        result.written.push((current.identity, path));
    }

    Ok(result)
}
