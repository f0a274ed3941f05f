use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::models::{Category, VaultEntry};
use crate::storage::{KeyValueStore, atomic_write, restrict_file};
use crate::store::VaultStore;

pub const APP_NAME: &str = "SecureVault";

/// Backup file layout. Import reads the same shape back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub entries: Vec<VaultEntry>,
    pub categories: Vec<Category>,
    pub export_date: String,
    pub app: String,
}

impl ExportDocument {
    pub fn snapshot<S: KeyValueStore>(store: &VaultStore<S>, now: DateTime<Utc>) -> Self {
        Self {
            entries: store.entries().to_vec(),
            categories: store.categories().to_vec(),
            export_date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            app: APP_NAME.to_string(),
        }
    }
}

pub fn export_file_name(entry_count: usize, now: DateTime<Utc>) -> String {
    format!(
        "backup_vault_{entry_count}_item_{}.json",
        now.format("%Y-%m-%d")
    )
}

/// Writes a pretty-printed backup into `dir` and returns its path. The store
/// is only read.
pub fn write_export<S: KeyValueStore>(
    store: &VaultStore<S>,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, StoreError> {
    let document = ExportDocument::snapshot(store, now);
    let json = serde_json::to_string_pretty(&document).map_err(|source| StoreError::Serialize {
        key: "export",
        source,
    })?;
    let path = dir.join(export_file_name(document.entries.len(), now));
    atomic_write(&path, json.as_bytes())?;
    restrict_file(&path)?;
    info!(
        path = %path.display(),
        entries = document.entries.len(),
        categories = document.categories.len(),
        "backup exported"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ActiveView, ViewFilter};
    use crate::import::{ImportLog, ImportSource, run_import};
    use crate::models::{EntryDraft, EntryType};
    use crate::storage::MemoryStore;
    use crate::store::{ManualClock, SequentialIds};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    fn store() -> VaultStore<MemoryStore> {
        VaultStore::open(MemoryStore::new(), SequentialIds::new("e"), ManualClock::at(1_000))
            .unwrap()
    }

    #[test]
    fn file_name_carries_count_and_date() {
        assert_eq!(
            export_file_name(12, at(2024, 3, 7)),
            "backup_vault_12_item_2024-03-07.json"
        );
        assert_eq!(
            export_file_name(0, at(2025, 12, 31)),
            "backup_vault_0_item_2025-12-31.json"
        );
    }

    #[test]
    fn document_uses_camel_case_and_app_marker() {
        let mut store = store();
        store
            .create_entry(EntryDraft::titled("Router").kind(EntryType::Pin).value("0000"))
            .unwrap();
        let doc = ExportDocument::snapshot(&store, at(2024, 1, 2));
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["app"], "SecureVault");
        assert_eq!(json["exportDate"], "2024-01-02T09:30:00.000Z");
        assert_eq!(json["entries"][0]["type"], "PIN");
        assert_eq!(json["entries"][0]["categoryId"], "uncategorized");
        assert!(json["entries"][0].get("username").is_none());
        assert_eq!(json["categories"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn export_then_import_into_empty_vault_reproduces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = store();
        source.create_category("Travel", "bg-teal-500").unwrap();
        source
            .create_entry(EntryDraft::titled("Mail").value("pw").username("me").category("work"))
            .unwrap();
        source
            .create_entry(EntryDraft::titled("Phone").kind(EntryType::Pattern).value("0,4,8"))
            .unwrap();
        source
            .create_entry(EntryDraft::titled("API").kind(EntryType::SecretKey).value("sk-1"))
            .unwrap();
        let path = write_export(&source, dir.path(), at(2024, 5, 5)).unwrap();
        assert!(path.ends_with("backup_vault_3_item_2024-05-05.json"));

        let mut target = VaultStore::open(
            MemoryStore::new(),
            SequentialIds::new("t"),
            ManualClock::at(9_999),
        )
        .unwrap();
        let mut filter = ViewFilter::default();
        let mut view = ActiveView::Portals;
        run_import(
            &mut target,
            &mut filter,
            &mut view,
            ImportSource::File(path),
            &mut ImportLog::default(),
        )
        .unwrap();

        let mut expected = source.entries().to_vec();
        expected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assert_eq!(target.entries(), expected.as_slice());
        assert_eq!(target.categories(), source.categories());
        assert_eq!(view, ActiveView::Vault);
    }
}
