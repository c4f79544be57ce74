use colored::Colorize;

use crate::error::Result;
use crate::migrate::migrate;
use crate::settings::{expand_home, Settings};

pub fn run(settings: &Settings, source: &str, force: bool) -> Result<()> {
    let source = expand_home(source);
    println!("Migrating {} -> {}", source.display(), settings.db_path.display());

    let report = migrate(&source, &settings.db_path, force)?;

    println!(
        "{} {} records copied and verified into {}.",
        "Done:".green().bold(),
        report.records,
        report.destination.display()
    );
    println!("The old database was left at {}.", report.source.display());
    Ok(())
}
