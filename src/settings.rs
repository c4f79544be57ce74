use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::eligibility::DEFAULT_PRICE_THRESHOLD;
use crate::error::{PurchasesError, Result};

pub const APP_NAME: &str = "purchases";

pub const ENV_DB_PATH: &str = "PURCHASES_DB_PATH";
pub const ENV_DATA_DIR: &str = "PURCHASES_DATA_DIR";
pub const ENV_CONFIG_DIR: &str = "PURCHASES_CONFIG_DIR";
pub const ENV_VAULT_PATH: &str = "VAULT_PATH";

const ENV_OVERRIDES: &[&str] = &[ENV_DB_PATH, ENV_DATA_DIR, ENV_CONFIG_DIR, ENV_VAULT_PATH];

/// Optional `settings.json` in the config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub vault_path: Option<String>,
    #[serde(default)]
    pub price_threshold: Option<Decimal>,
    #[serde(default)]
    pub default_currency: Option<String>,
}

/// Configuration resolved once per command and passed to whatever needs it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
    pub db_path: PathBuf,
    pub vault_path: Option<PathBuf>,
    pub price_threshold: Decimal,
    pub default_currency: Option<String>,
    pub env_overrides: Vec<(&'static str, String)>,
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| home_dir().join(".local").join("share"))
        .join(APP_NAME)
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home_dir().join(".config"))
        .join(APP_NAME)
}

fn default_vault_path() -> Option<PathBuf> {
    let path = home_dir()
        .join("Library")
        .join("Mobile Documents")
        .join("iCloud~md~obsidian")
        .join("Documents")
        .join("Orbis Sapiens");
    path.exists().then_some(path)
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
    }
    PathBuf::from(path)
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join("settings.json")
}

pub fn load_settings_file(config_dir: &Path) -> Result<SettingsFile> {
    let path = settings_path(config_dir);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| PurchasesError::Settings(format!("{}: {e}", path.display())))
}

impl Settings {
    pub fn resolve() -> Result<Self> {
        Self::resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve paths and policy. Precedence: environment, then
    /// `settings.json`, then platform defaults.
    pub fn resolve_with<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let data_dir = var(ENV_DATA_DIR)
            .map(|v| expand_home(&v))
            .unwrap_or_else(default_data_dir);
        let config_dir = var(ENV_CONFIG_DIR)
            .map(|v| expand_home(&v))
            .unwrap_or_else(default_config_dir);
        let db_path = var(ENV_DB_PATH)
            .map(|v| expand_home(&v))
            .unwrap_or_else(|| data_dir.join(format!("{APP_NAME}.db")));

        let file = load_settings_file(&config_dir)?;
        let vault_path = var(ENV_VAULT_PATH)
            .or(file.vault_path)
            .map(|v| expand_home(&v))
            .or_else(default_vault_path);

        let env_overrides = ENV_OVERRIDES
            .iter()
            .filter_map(|key| var(*key).map(|v| (*key, v)))
            .collect();

        Ok(Self {
            data_dir,
            config_dir,
            db_path,
            vault_path,
            price_threshold: file
                .price_threshold
                .unwrap_or_else(|| Decimal::from(DEFAULT_PRICE_THRESHOLD)),
            default_currency: file.default_currency,
            env_overrides,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_db_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config");
        let config = config.to_str().unwrap();
        let s = Settings::resolve_with(env_of(&[
            (ENV_DB_PATH, "/tmp/direct.db"),
            (ENV_DATA_DIR, "/tmp/data"),
            (ENV_CONFIG_DIR, config),
        ]))
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/direct.db"));
        assert_eq!(s.data_dir, PathBuf::from("/tmp/data"));
    }

    #[test]
    fn test_db_path_defaults_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config");
        let s = Settings::resolve_with(env_of(&[
            (ENV_DATA_DIR, "/tmp/data"),
            (ENV_CONFIG_DIR, config.to_str().unwrap()),
        ]))
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/data/purchases.db"));
        assert_eq!(s.price_threshold, Decimal::from(100));
        assert_eq!(s.env_overrides.len(), 2);
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config");
        let s = Settings::resolve_with(env_of(&[
            (ENV_DB_PATH, ""),
            (ENV_DATA_DIR, "/tmp/data"),
            (ENV_CONFIG_DIR, config.to_str().unwrap()),
        ]))
        .unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/data/purchases.db"));
    }

    #[test]
    fn test_settings_file_supplies_policy_and_vault() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            settings_path(dir.path()),
            r#"{"vault_path": "/vaults/home", "price_threshold": 250, "default_currency": "EUR"}"#,
        )
        .unwrap();
        let s = Settings::resolve_with(env_of(&[(ENV_CONFIG_DIR, dir.path().to_str().unwrap())])).unwrap();
        assert_eq!(s.vault_path, Some(PathBuf::from("/vaults/home")));
        assert_eq!(s.price_threshold, Decimal::from_str("250").unwrap());
        assert_eq!(s.default_currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_env_vault_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(settings_path(dir.path()), r#"{"vault_path": "/vaults/home"}"#).unwrap();
        let s = Settings::resolve_with(env_of(&[
            (ENV_CONFIG_DIR, dir.path().to_str().unwrap()),
            (ENV_VAULT_PATH, "/vaults/env"),
        ]))
        .unwrap();
        assert_eq!(s.vault_path, Some(PathBuf::from("/vaults/env")));
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let file: SettingsFile = serde_json::from_str(r#"{"default_currency": "GBP"}"#).unwrap();
        assert!(file.vault_path.is_none());
        assert!(file.price_threshold.is_none());
    }

    #[test]
    fn test_malformed_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(settings_path(dir.path()), "{not json").unwrap();
        let err = Settings::resolve_with(env_of(&[(ENV_CONFIG_DIR, dir.path().to_str().unwrap())])).unwrap_err();
        assert!(matches!(err, PurchasesError::Settings(_)));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~/vault"), home.join("vault"));
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
