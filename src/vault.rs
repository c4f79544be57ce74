//! Obsidian vault asset notes.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::PurchaseRecord;

pub const ASSETS_FOLDER: &str = "50-Databases/Assets";

const MAX_FILENAME_CHARS: usize = 80;
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum VaultWriteError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capability the export coordinator writes notes through.
pub trait VaultWriter {
    /// Persist a note for `record`, returning where it was written.
    fn write_note(&mut self, record: &PurchaseRecord) -> Result<PathBuf, VaultWriteError>;
}

const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize_filename(name: &str) -> String {
    let stripped: String = name
        .chars()
        .filter(|c| !INVALID_FILENAME_CHARS.contains(c))
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_FILENAME_CHARS {
        let head: String = collapsed.chars().take(MAX_FILENAME_CHARS - 3).collect();
        format!("{}...", head.trim_end())
    } else {
        collapsed
    }
}

/// Writes Markdown asset notes under `<vault>/50-Databases/Assets`.
pub struct ObsidianVault {
    assets_dir: PathBuf,
}

impl ObsidianVault {
    pub fn new(vault_root: &Path) -> Self {
        Self {
            assets_dir: vault_root.join(ASSETS_FOLDER),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Note paths to try for `record`, in order: the plain name, then the
    /// SKU, then SKU and order id, then a counter on top of those.
    pub fn candidate_paths(&self, record: &PurchaseRecord) -> impl Iterator<Item = PathBuf> + '_ {
        let base = sanitize_filename(&record.name);
        let order = sanitize_filename(&record.order_id);
        let sku = record.sku.as_deref().map(sanitize_filename);
        let dir = &self.assets_dir;

        let mut names = vec![base.clone()];
        let qualifier = match sku {
            Some(sku) => {
                names.push(format!("{base} ({sku})"));
                format!("{sku}, {order}")
            }
            None => order,
        };
        names.push(format!("{base} ({qualifier})"));

        names
            .into_iter()
            .chain((2..).map(move |n| format!("{base} ({qualifier}, {n})")))
            .take(MAX_NAME_ATTEMPTS)
            .map(move |name| dir.join(format!("{name}.md")))
    }
}

fn create_note(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())
}

impl VaultWriter for ObsidianVault {
    /// Existing notes are never overwritten; a taken name moves on to the next candidate.
    fn write_note(&mut self, record: &PurchaseRecord) -> Result<PathBuf, VaultWriteError> {
        std::fs::create_dir_all(&self.assets_dir).map_err(|source| VaultWriteError::Io {
            path: self.assets_dir.clone(),
            source,
        })?;
        let content = render_note(record);
        for path in self.candidate_paths(record) {
            match create_note(&path, &content) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(VaultWriteError::Io { path, source }),
            }
        }
        Err(VaultWriteError::Io {
            path: self.assets_dir.join(format!("{}.md", sanitize_filename(&record.name))),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "no free note name"),
        })
    }
}

fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

pub fn render_note(record: &PurchaseRecord) -> String {
    let item_url = record.item_url.as_deref().unwrap_or("");
    let order_url = record.order_url.as_deref().unwrap_or("");
    let mut note = String::new();
    note.push_str("---\n");
    note.push_str("type: asset\n");
    note.push_str(&format!("name: {}\n", yaml_quote(&record.name)));
    note.push_str(&format!("category: {}\n", record.category));
    note.push_str(&format!("purchase_date: {}\n", record.purchase_date.format("%Y-%m-%d")));
    note.push_str(&format!("price: {:.2}\n", record.price));
    note.push_str(&format!("currency: {}\n", record.currency.as_deref().unwrap_or("")));
    note.push_str(&format!("vendor: {}\n", record.vendor));
    note.push_str(&format!("vendor_sku: {}\n", yaml_quote(record.sku.as_deref().unwrap_or(""))));
    note.push_str(&format!("order_id: {}\n", yaml_quote(&record.order_id)));
    note.push_str("warranty_until:\n");
    note.push_str("status: owned\n");
    note.push_str(&format!("product_url: {}\n", yaml_quote(item_url)));
    note.push_str("---\n");
    note.push_str(&format!("\n# {}\n\n## Notes\n\n\n## Links\n", record.name));
    if !item_url.is_empty() {
        note.push_str(&format!("- [Product page]({item_url})\n"));
    }
    if !order_url.is_empty() {
        note.push_str(&format!("- [Order]({order_url})\n"));
    }
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::store::tests::sample_record;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("USB-C: Hub / 7 <ports>"), "USB-C Hub 7 ports");
        assert_eq!(sanitize_filename("  too   many\tspaces "), "too many spaces");
        let long = "x".repeat(120);
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.chars().count(), 80);
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn test_render_note_frontmatter() {
        let mut record = sample_record("amazon:A2:B0FIL", "3D Printer Filament \"PLA\"", "25");
        record.category = Category::ThreeDPrinting;
        record.sku = Some("B0FIL".to_string());
        record.item_url = Some("https://example.com/dp/B0FIL".to_string());
        let note = render_note(&record);
        assert!(note.starts_with("---\ntype: asset\n"));
        assert!(note.contains("name: \"3D Printer Filament \\\"PLA\\\"\"\n"));
        assert!(note.contains("category: 3d-printing\n"));
        assert!(note.contains("purchase_date: 2024-01-05\n"));
        assert!(note.contains("price: 25.00\n"));
        assert!(note.contains("vendor_sku: \"B0FIL\"\n"));
        assert!(note.contains("- [Product page](https://example.com/dp/B0FIL)\n"));
        assert!(!note.contains("[Order]"));
    }

    #[test]
    fn test_write_note_creates_assets_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = ObsidianVault::new(dir.path());
        let record = sample_record("amazon:A1:#1", "Standing Desk", "499.00");
        let path = vault.write_note(&record).unwrap();
        assert_eq!(path, dir.path().join(ASSETS_FOLDER).join("Standing Desk.md"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Standing Desk"));
    }

    #[test]
    fn test_name_collision_appends_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = ObsidianVault::new(dir.path());
        let first = sample_record("amazon:A1:#1", "Standing Desk", "499.00");
        let mut second = sample_record("amazon:A9:B0DESK", "Standing Desk", "520.00");
        second.sku = Some("B0DESK".to_string());
        vault.write_note(&first).unwrap();
        let path = vault.write_note(&second).unwrap();
        assert_eq!(path.file_name().unwrap(), "Standing Desk (B0DESK).md");
    }

    fn filament(order_id: &str) -> PurchaseRecord {
        let mut record = sample_record(&format!("amazon:{order_id}:B0FIL"), "SUNLU PLA Filament", "21.99");
        record.sku = Some("B0FIL".to_string());
        record
    }

    #[test]
    fn test_repeat_purchases_get_distinct_notes() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = ObsidianVault::new(dir.path());
        let paths: Vec<PathBuf> = ["O1", "O2", "O3"]
            .iter()
            .map(|order| vault.write_note(&filament(order)).unwrap())
            .collect();

        let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(
            names,
            vec![
                "SUNLU PLA Filament.md",
                "SUNLU PLA Filament (B0FIL).md",
                "SUNLU PLA Filament (B0FIL, O3).md",
            ]
        );
        assert_eq!(std::fs::read_dir(vault.assets_dir()).unwrap().count(), 3);
        let second = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(second.contains("order_id: \"O2\""));
    }

    #[test]
    fn test_exhausted_suffixes_fall_back_to_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = ObsidianVault::new(dir.path());
        let record = filament("O1");
        for _ in 0..4 {
            vault.write_note(&record).unwrap();
        }
        assert!(vault.assets_dir().join("SUNLU PLA Filament (B0FIL, O1, 2).md").exists());
        assert_eq!(std::fs::read_dir(vault.assets_dir()).unwrap().count(), 4);
    }

    #[test]
    fn test_existing_note_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = ObsidianVault::new(dir.path());
        std::fs::create_dir_all(vault.assets_dir()).unwrap();
        let existing = vault.assets_dir().join("Standing Desk.md");
        std::fs::write(&existing, "hand-written notes").unwrap();

        let record = sample_record("amazon:A1:#1", "Standing Desk", "499.00");
        let path = vault.write_note(&record).unwrap();
        assert_eq!(path.file_name().unwrap(), "Standing Desk (A1).md");
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "hand-written notes");
    }
}
