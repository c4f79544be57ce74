use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::{PurchasesError, Result};
use crate::store;

#[derive(Debug)]
pub struct MigrationReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub records: i64,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "purchases.db".into());
    name.push(suffix);
    path.with_file_name(name)
}

fn staging_path(destination: &Path) -> PathBuf {
    with_suffix(destination, ".migrating")
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Remove the WAL and shared-memory files of a database that is about to be
/// replaced, so SQLite cannot replay them onto the new file.
fn remove_sidecars(database: &Path) -> Result<()> {
    remove_if_exists(&with_suffix(database, "-wal"))?;
    remove_if_exists(&with_suffix(database, "-shm"))
}

fn backup_into(src: &Connection, staging: &Path) -> Result<()> {
    let mut dest = Connection::open(staging)?;
    let backup = Backup::new(src, &mut dest)?;
    backup.run_to_completion(100, Duration::from_millis(10), None)?;
    Ok(())
}

fn verify(expected: i64, actual: i64) -> Result<()> {
    if actual != expected {
        warn!(expected, actual, "migration verification failed");
        return Err(PurchasesError::MigrationVerification { expected, actual });
    }
    Ok(())
}

/// Copy the database at `source` to `destination`.
///
/// The copy is staged next to the destination, its record count is checked
/// against the source, and only then is it renamed into place. The count is
/// checked once more on the renamed file. The source is never removed.
pub fn migrate(source: &Path, destination: &Path, force: bool) -> Result<MigrationReport> {
    migrate_with(source, destination, force, backup_into)
}

fn migrate_with<F>(source: &Path, destination: &Path, force: bool, copy: F) -> Result<MigrationReport>
where
    F: FnOnce(&Connection, &Path) -> Result<()>,
{
    if !source.is_file() {
        return Err(PurchasesError::MigrationSourceMissing(source.to_path_buf()));
    }
    if destination.exists() && !force {
        return Err(PurchasesError::MigrationDestinationExists(destination.to_path_buf()));
    }
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let src = Connection::open(source)?;
    let expected = store::count(&src)?;

    let staging = staging_path(destination);
    remove_if_exists(&staging)?;
    let staged = copy(&src, &staging).and_then(|()| {
        let copy = Connection::open(&staging)?;
        // The copy inherits WAL mode from the source; it must be one file before the rename.
        copy.execute_batch("PRAGMA journal_mode=DELETE;")?;
        verify(expected, store::count(&copy)?)
    });
    if let Err(e) = staged {
        remove_if_exists(&staging)?;
        return Err(e);
    }

    remove_sidecars(destination)?;
    std::fs::rename(&staging, destination)?;

    let actual = store::count(&Connection::open(destination)?)?;
    verify(expected, actual)?;
    info!(
        source = %source.display(),
        destination = %destination.display(),
        records = actual,
        "migrated database"
    );

    Ok(MigrationReport {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        records: actual,
    })
}
