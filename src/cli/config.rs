use crate::error::Result;
use crate::settings::{settings_path, Settings};

pub fn run(settings: &Settings) -> Result<()> {
    let settings_file = settings_path(&settings.config_dir);

    println!("Database:   {}", settings.db_path.display());
    if !settings.db_path.exists() {
        println!("            (not created yet)");
    }
    println!("Data dir:   {}", settings.data_dir.display());
    println!("Config dir: {}", settings.config_dir.display());
    println!(
        "Settings:   {}{}",
        settings_file.display(),
        if settings_file.exists() { "" } else { " (not found)" }
    );
    match &settings.vault_path {
        Some(vault) => println!(
            "Vault:      {}{}",
            vault.display(),
            if vault.is_dir() { "" } else { " (not found)" }
        ),
        None => println!("Vault:      (not set)"),
    }
    println!("Threshold:  {}", settings.price_threshold);
    println!(
        "Currency:   {}",
        settings.default_currency.as_deref().unwrap_or("(from file)")
    );

    if !settings.env_overrides.is_empty() {
        println!();
        println!("Environment overrides:");
        for (key, value) in &settings.env_overrides {
            println!("  {key}={value}");
        }
    }

    Ok(())
}
