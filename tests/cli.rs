//! End-to-end tests for the `purchases` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ORDERS_CSV: &str = "\
Order ID,Order Date,Title,Category,ASIN/ISBN,Item Total,Quantity
111-0000001-0000001,2024-03-01,Standing Desk Frame,Furniture,B0DESK0001,€499.00,1
111-0000001-0000001,2024-03-01,AA Alkaline Batteries 24 Pack,,B0BATT0001,€12.99,1
111-0000002-0000002,2024-02-10,SUNLU PLA Filament 1kg,,B0FILA0001,€21.99,2
111-0000003-0000003,2024-01-15,Decorative Ceramic Vase,,B0VASE0001,€149.00,1
111-0000004-0000004,2024-01-20,Kindle Paperwhite eBook Bundle,,B0KIND0001,€159.00,1
111-0000005-0000005,2024-01-22,Notebook,,B0NOTE0001,€4.50,1
111-0000006-0000006,not a date,Broken Row,,B0BROK0001,€10.00,1
";

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let env = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::write(env.orders(), ORDERS_CSV).unwrap();
        env
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn orders(&self) -> PathBuf {
        self.path("orders.csv")
    }

    fn db(&self) -> PathBuf {
        self.path("data").join("purchases.db")
    }

    fn vault(&self) -> PathBuf {
        self.path("vault")
    }

    fn assets(&self) -> PathBuf {
        self.vault().join("50-Databases").join("Assets")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("purchases"));
        cmd.current_dir(self.dir.path());
        cmd.env("HOME", self.dir.path());
        cmd.env("PURCHASES_DATA_DIR", self.path("data"));
        cmd.env("PURCHASES_CONFIG_DIR", self.path("config"));
        cmd.env("PURCHASES_DB_PATH", self.db());
        cmd.env("VAULT_PATH", self.vault());
        cmd.env("PURCHASES_LOG", "error");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn import(&self) {
        self.cmd()
            .args(["import", "amazon", "-f"])
            .arg(self.orders())
            .assert()
            .success();
    }
}

fn note_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[test]
fn config_shows_resolved_paths() {
    let env = Env::new();
    env.cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains(env.db().to_string_lossy().as_ref()))
        .stdout(predicate::str::contains("PURCHASES_DB_PATH="))
        .stdout(predicate::str::contains("Threshold:  100"));
}

#[test]
fn import_reports_counts_and_bad_rows() {
    let env = Env::new();
    env.cmd()
        .args(["import", "amazon", "--file"])
        .arg(env.orders())
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:       7"))
        .stdout(predicate::str::contains("New:        6"))
        .stdout(predicate::str::contains("1 rows could not be imported"))
        .stdout(predicate::str::contains("unparsable date 'not a date'"));
    assert!(env.db().exists());
}

#[test]
fn reimport_skips_existing_rows() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["import", "amazon", "-f"])
        .arg(env.orders())
        .assert()
        .success()
        .stdout(predicate::str::contains("imported before"))
        .stdout(predicate::str::contains("New:        0"))
        .stdout(predicate::str::contains("Skipped:    6"));
}

#[test]
fn import_missing_file_fails() {
    let env = Env::new();
    env.cmd()
        .args(["import", "amazon", "-f", "does-not-exist.csv"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn import_unknown_source_fails() {
    let env = Env::new();
    env.cmd()
        .args(["import", "ebay", "-f"])
        .arg(env.orders())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown import source: ebay"));
}

#[test]
fn stats_after_import() {
    let env = Env::new();
    env.import();
    env.cmd()
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Items"))
        .stdout(predicate::str::contains("3d-printing"))
        .stdout(predicate::str::contains("furniture"));
}

#[test]
fn list_shows_only_eligible_items() {
    let env = Env::new();
    env.import();
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Standing Desk Frame"))
        .stdout(predicate::str::contains("SUNLU PLA Filament"))
        .stdout(predicate::str::contains("Decorative Ceramic Vase"))
        .stdout(predicate::str::contains("Batteries").not())
        .stdout(predicate::str::contains("Kindle").not())
        .stdout(predicate::str::contains("Notebook").not())
        .stdout(predicate::str::contains("3 items pending export"));
}

#[test]
fn list_min_price_raises_threshold() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["list", "--min-price", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Decorative Ceramic Vase").not())
        .stdout(predicate::str::contains("2 items pending export"));
}

#[test]
fn search_by_date() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["search", "--date", "2024-02-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUNLU PLA Filament"))
        .stdout(predicate::str::contains("1 matches"));
}

#[test]
fn export_dry_run_writes_nothing() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["export", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 items to export"))
        .stdout(predicate::str::contains("Dry run"));
    assert!(note_names(&env.assets()).is_empty());
}

#[test]
fn export_writes_notes_once() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["export", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 items to"));
    assert_eq!(
        note_names(&env.assets()),
        vec![
            "Decorative Ceramic Vase.md",
            "SUNLU PLA Filament 1kg.md",
            "Standing Desk Frame.md",
        ]
    );
    let desk = fs::read_to_string(env.assets().join("Standing Desk Frame.md")).unwrap();
    assert!(desk.contains("category: furniture"));
    assert!(desk.contains("vendor_sku: \"B0DESK0001\""));

    env.cmd()
        .args(["export", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No items pending export."));
}

#[test]
fn reset_export_makes_record_pending_again() {
    let env = Env::new();
    env.import();
    env.cmd().args(["export", "-y"]).assert().success();
    env.cmd()
        .args(["reset-export", "amazon:111-0000003-0000003:B0VASE0001"])
        .assert()
        .success();
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 items pending export"));
}

#[test]
fn export_without_vault_fails() {
    let env = Env::new();
    env.import();
    env.cmd()
        .env_remove("VAULT_PATH")
        .args(["export", "-y"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No vault configured"));
}

#[test]
fn migrate_copies_database() {
    let env = Env::new();
    env.import();
    let old = env.db();

    let target = env.path("moved").join("purchases.db");
    env.cmd()
        .env("PURCHASES_DB_PATH", &target)
        .arg("migrate")
        .arg(&old)
        .assert()
        .success()
        .stdout(predicate::str::contains("6 records copied"));
    assert!(target.exists());
    assert!(old.exists());

    env.cmd()
        .env("PURCHASES_DB_PATH", &target)
        .arg("migrate")
        .arg(&old)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn export_without_terminal_is_declined() {
    let env = Env::new();
    env.import();
    env.cmd()
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::contains("Aborted."));
    assert!(note_names(&env.assets()).is_empty());
}

#[test]
fn reimport_in_update_mode_refreshes_rows() {
    let env = Env::new();
    env.import();
    env.cmd()
        .args(["import", "amazon", "-u", "-f"])
        .arg(env.orders())
        .assert()
        .success()
        .stdout(predicate::str::contains("existing rows are refreshed"))
        .stdout(predicate::str::contains("Updated:    6"));
}
