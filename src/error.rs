use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PurchasesError {
    #[error("Storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Unknown import source: {0}")]
    UnknownSource(String),

    #[error("Import file has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("No vault configured. Set VAULT_PATH or use --vault.")]
    NoVault,

    #[error("Source database not found: {}", .0.display())]
    MigrationSourceMissing(PathBuf),

    #[error("Destination already exists: {}\nUse --force to overwrite.", .0.display())]
    MigrationDestinationExists(PathBuf),

    #[error("Migration verification failed: source has {expected} records, copy has {actual}")]
    MigrationVerification { expected: i64, actual: i64 },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PurchasesError>;
