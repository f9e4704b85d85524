use clap::Args;
use serde_json::Value;
use std::path::{Path, PathBuf};

use classplan::{ImportKind, ImportMode, SyncStore};

use super::settle;

/// Bulk-load records from a JSON or YAML file
#[derive(Args)]
pub struct ImportCommand {
    /// What the file contains: teachers, assistants, courses or sessions
    kind: ImportKind,

    /// File holding an array of records (.json, .yaml or .yml)
    file: PathBuf,

    /// append adds to existing records, replace overwrites them
    #[arg(long, short, default_value = "append")]
    mode: ImportMode,
}

/// Reads an array of records. YAML is used for `.yaml`/`.yml` files,
/// JSON otherwise.
pub fn read_records(path: &Path) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let records: Vec<Value> = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    };
    Ok(records)
}

impl ImportCommand {
    pub async fn run(&self, store: &SyncStore) -> Result<(), Box<dyn std::error::Error>> {
        let records = read_records(&self.file)?;
        if records.is_empty() && self.mode == ImportMode::Append {
            println!("Nothing to import");
            return Ok(());
        }

        let report = store.import_data(self.kind, records, self.mode)?;
        println!(
            "Imported {} {} ({})",
            report.count, report.kind, report.mode
        );

        if self.kind == ImportKind::Sessions {
            let snap = store.snapshot();
            let touched = snap.courses.iter().filter(|c| c.session_count > 0).count();
            println!("Recomputed totals for {} course(s) with sessions", touched);
        }

        settle(report.sync).await
    }
}
