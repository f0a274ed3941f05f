//! Merge-import of backup files.
//!
//! The pipeline reads and validates the document, reconciles folders,
//! normalizes every record, then merges by id (imported records win) and
//! commits in one write. Nothing touches the store until the merged plan has
//! been computed, so a failure at any stage leaves the vault as it was.
//!
//! Progress is reported as numbered stages:
//!
//! | stage | meaning |
//! |-------|---------|
//! | 1 | reading the file |
//! | 2 | parsing JSON |
//! | 3 | validating structure and items |
//! | 4 | syncing folders |
//! | 5 | writing the vault |
//! | 7 | done |

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::ImportError;
use crate::filter::{ActiveView, ViewFilter};
use crate::models::{Category, DEFAULT_COLOR, EntryType, UNCATEGORIZED_ID, VaultEntry};
use crate::pattern;
use crate::storage::KeyValueStore;
use crate::store::VaultStore;

pub const FINAL_STAGE: u8 = 7;
pub const IMPORTED_FOLDER_NAME: &str = "Imported Folder";

/// Raw `type` markers, checked in this order against the uppercased value.
/// Anything unmatched is a password.
pub const TYPE_MARKERS: [(&str, EntryType); 4] = [
    ("PIN", EntryType::Pin),
    ("SEED", EntryType::SeedPhrase),
    ("PATTERN", EntryType::Pattern),
    ("SECRET", EntryType::SecretKey),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEvent {
    pub stage: u8,
    pub message: String,
    pub is_error: bool,
}

pub trait ImportObserver {
    fn on_event(&mut self, event: &ImportEvent);
}

impl<F: FnMut(&ImportEvent)> ImportObserver for F {
    fn on_event(&mut self, event: &ImportEvent) {
        self(event)
    }
}

/// Collects every event; the UI replays these as the progress log.
#[derive(Debug, Clone, Default)]
pub struct ImportLog {
    pub events: Vec<ImportEvent>,
}

impl ImportLog {
    pub fn last(&self) -> Option<&ImportEvent> {
        self.events.last()
    }

    pub fn failed(&self) -> bool {
        self.events.iter().any(|e| e.is_error)
    }
}

impl ImportObserver for ImportLog {
    fn on_event(&mut self, event: &ImportEvent) {
        self.events.push(event.clone());
    }
}

pub enum ImportSource {
    File(PathBuf),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub categories: Vec<Category>,
    pub entries: Vec<VaultEntry>,
    pub added_categories: usize,
    pub imported: usize,
    pub novel: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub novel: usize,
    pub updated: usize,
    pub added_categories: usize,
    pub total_entries: usize,
}

struct Progress<'a> {
    observer: &'a mut dyn ImportObserver,
    stage: u8,
}

impl Progress<'_> {
    fn step(&mut self, stage: u8, message: impl Into<String>) {
        self.stage = stage;
        let event = ImportEvent {
            stage,
            message: message.into(),
            is_error: false,
        };
        info!(stage, message = %event.message, "import progress");
        self.observer.on_event(&event);
    }

    fn fail(&mut self, err: &ImportError) {
        let event = ImportEvent {
            stage: self.stage,
            message: err.to_string(),
            is_error: true,
        };
        warn!(stage = self.stage, error = %err, "import aborted");
        self.observer.on_event(&event);
    }
}

/// Runs the whole pipeline against `store`. On success the folder filter and
/// search are cleared and the vault list becomes the active view.
pub fn run_import<S: KeyValueStore>(
    store: &mut VaultStore<S>,
    filter: &mut ViewFilter,
    view: &mut ActiveView,
    source: ImportSource,
    observer: &mut dyn ImportObserver,
) -> Result<ImportSummary, ImportError> {
    let mut progress = Progress { observer, stage: 1 };
    progress.step(1, "Preparing import...");
    match run_stages(store, source, &mut progress) {
        Ok(summary) => {
            filter.clear();
            *view = ActiveView::Vault;
            Ok(summary)
        }
        Err(err) => {
            progress.fail(&err);
            Err(err)
        }
    }
}

fn run_stages<S: KeyValueStore>(
    store: &mut VaultStore<S>,
    source: ImportSource,
    progress: &mut Progress<'_>,
) -> Result<ImportSummary, ImportError> {
    let text = match source {
        ImportSource::File(path) => read_source(&path)?,
        ImportSource::Text(text) => text,
    };
    progress.step(2, "File read. Analysing JSON structure...");

    let document = parse_document(&text)?;
    progress.step(
        3,
        format!(
            "Found {} records. Validating items...",
            document.entries.len()
        ),
    );

    progress.step(4, "Syncing folders...");
    let existing_categories = store.categories().to_vec();
    let existing_entries = store.entries().to_vec();
    let now = store.now();
    let plan = plan_import(
        &document,
        &existing_categories,
        &existing_entries,
        &mut || store.fresh_id(),
        now,
    );

    progress.step(5, "Saving data to the local vault...");
    let summary = ImportSummary {
        imported: plan.imported,
        novel: plan.novel,
        updated: plan.updated,
        added_categories: plan.added_categories,
        total_entries: plan.entries.len(),
    };
    store.replace_all(plan.categories, plan.entries)?;

    progress.step(FINAL_STAGE, "Done! Data secured.");
    info!(
        imported = summary.imported,
        novel = summary.novel,
        folders_added = summary.added_categories,
        "import committed"
    );
    Ok(summary)
}

fn read_source(path: &Path) -> Result<String, ImportError> {
    fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// The two arrays an import file contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDocument {
    pub entries: Vec<Value>,
    pub categories: Vec<Value>,
}

pub fn parse_document(text: &str) -> Result<ImportDocument, ImportError> {
    let root: Value = serde_json::from_str(text).map_err(ImportError::Malformed)?;
    let Some(entries) = root.get("entries").and_then(Value::as_array) else {
        return Err(ImportError::IncompleteStructure);
    };
    let categories = root
        .get("categories")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(ImportDocument {
        entries: entries.clone(),
        categories,
    })
}

/// Computes the merged collections without touching any store.
pub fn plan_import(
    document: &ImportDocument,
    existing_categories: &[Category],
    existing_entries: &[VaultEntry],
    fresh_id: &mut dyn FnMut() -> String,
    now: i64,
) -> ImportPlan {
    let (categories, added_categories) =
        reconcile_categories(existing_categories, &document.categories);
    let valid_ids: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();

    let by_id: HashMap<&str, &VaultEntry> =
        existing_entries.iter().map(|e| (e.id.as_str(), e)).collect();
    let imported: Vec<VaultEntry> = document
        .entries
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| normalize_entry(item, idx, &valid_ids, &by_id, fresh_id, now))
        .collect();

    let touched: HashSet<&str> = imported.iter().map(|e| e.id.as_str()).collect();
    let novel = touched.iter().filter(|id| !by_id.contains_key(*id)).count();
    let updated = touched.len() - novel;
    let imported_count = imported.len();
    let entries = merge_entries(existing_entries, imported);

    ImportPlan {
        categories,
        entries,
        added_categories,
        imported: imported_count,
        novel,
        updated,
    }
}

/// Existing folders first, then every imported folder whose id is new.
pub fn reconcile_categories(existing: &[Category], imported: &[Value]) -> (Vec<Category>, usize) {
    let mut result = existing.to_vec();
    let mut added = 0;
    for raw in imported {
        let Some(id) = truthy(raw.get("id")).map(coerce_string) else {
            continue;
        };
        if result.iter().any(|c| c.id == id) {
            continue;
        }
        let name = truthy(raw.get("name"))
            .map(coerce_string)
            .unwrap_or_else(|| IMPORTED_FOLDER_NAME.to_string());
        let color = truthy(raw.get("color"))
            .map(coerce_string)
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());
        result.push(Category { id, name, color });
        added += 1;
    }
    (result, added)
}

pub fn classify_type(raw: &str) -> EntryType {
    let upper = raw.to_uppercase();
    TYPE_MARKERS
        .iter()
        .find(|(marker, _)| upper.contains(marker))
        .map(|(_, kind)| *kind)
        .unwrap_or(EntryType::Password)
}

/// Turns one raw record into an entry. Falsy records and patterns that do
/// not decode are skipped. When the id matches an existing entry, fields the
/// record leaves out keep their current values.
pub fn normalize_entry(
    item: &Value,
    index: usize,
    valid_category_ids: &HashSet<&str>,
    existing: &HashMap<&str, &VaultEntry>,
    fresh_id: &mut dyn FnMut() -> String,
    now: i64,
) -> Option<VaultEntry> {
    if !is_truthy(item) {
        return None;
    }
    let field = |key: &str| truthy(item.get(key)).map(coerce_string);

    let id = field("id").unwrap_or_else(|| fresh_id());
    let base = existing.get(id.as_str()).copied();

    let kind = match field("type") {
        Some(raw) => classify_type(&raw),
        None => base.map(|b| b.kind).unwrap_or_default(),
    };
    let category_id = match item.get("categoryId") {
        Some(Value::String(raw)) if !raw.is_empty() => {
            if valid_category_ids.contains(raw.as_str()) {
                raw.clone()
            } else {
                UNCATEGORIZED_ID.to_string()
            }
        }
        _ => base
            .map(|b| b.category_id.clone())
            .filter(|c| valid_category_ids.contains(c.as_str()))
            .unwrap_or_else(|| UNCATEGORIZED_ID.to_string()),
    };
    let title = field("title")
        .or_else(|| base.map(|b| b.title.clone()))
        .unwrap_or_else(|| format!("Import #{}", index + 1));
    let keep = |key: &str, current: Option<&Option<String>>| match field(key) {
        Some(v) => Some(v),
        None => current.cloned().flatten(),
    };
    let username = keep("username", base.map(|b| &b.username));
    let issuer = keep("issuer", base.map(|b| &b.issuer));
    let notes = keep("notes", base.map(|b| &b.notes));
    let mut value = field("value")
        .or_else(|| base.map(|b| b.value.clone()))
        .unwrap_or_default();
    if kind == EntryType::Pattern {
        match pattern::decode(&value) {
            Ok(points) => value = pattern::encode(&points),
            Err(err) => {
                warn!(record = index + 1, error = %err, "pattern record skipped");
                return None;
            }
        }
    }

    let created_at = coerce_millis(item.get("createdAt"))
        .or_else(|| base.map(|b| b.created_at))
        .unwrap_or(now);
    let last_modified = coerce_millis(item.get("lastModified"))
        .unwrap_or(now)
        .max(created_at);

    Some(VaultEntry {
        id,
        title,
        kind,
        category_id,
        username,
        issuer,
        value,
        notes,
        created_at,
        last_modified,
    })
}

/// Overlays `imported` onto `existing` by id, then orders newest first.
/// Ties keep their merge order.
pub fn merge_entries(existing: &[VaultEntry], imported: Vec<VaultEntry>) -> Vec<VaultEntry> {
    let mut merged: Vec<VaultEntry> = existing.to_vec();
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();
    for entry in imported {
        match index.get(&entry.id) {
            Some(&pos) => merged[pos] = entry,
            None => {
                index.insert(entry.id.clone(), merged.len());
                merged.push(entry);
            }
        }
    }
    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| is_truthy(v))
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Millisecond timestamps from numbers or numeric strings. Zero and
/// non-numeric values count as missing.
fn coerce_millis(value: Option<&Value>) -> Option<i64> {
    let parsed = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64),
        _ => None,
    };
    parsed.filter(|ms| *ms != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FailingStore, MemoryStore};
    use crate::store::{ManualClock, SequentialIds};
    use serde_json::json;

    fn no_existing() -> HashMap<&'static str, &'static VaultEntry> {
        HashMap::new()
    }

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("gen-{n}")
        }
    }

    #[test]
    fn type_classification_follows_marker_priority() {
        assert_eq!(classify_type("pin"), EntryType::Pin);
        assert_eq!(classify_type("Seed Phrase 24w"), EntryType::SeedPhrase);
        assert_eq!(classify_type("PATTERN-lock"), EntryType::Pattern);
        assert_eq!(classify_type("whatever"), EntryType::Password);
        assert_eq!(classify_type("Secret Key"), EntryType::SecretKey);
        // PIN outranks PATTERN even when both appear
        assert_eq!(classify_type("pattern pin"), EntryType::Pin);
        // "SPINE" contains PIN; substring matching is intended
        assert_eq!(classify_type("spine"), EntryType::Pin);
    }

    #[test]
    fn parse_requires_entries_array() {
        assert!(matches!(parse_document("{"), Err(ImportError::Malformed(_))));
        assert!(matches!(
            parse_document(r#"{"entries": {}}"#),
            Err(ImportError::IncompleteStructure)
        ));
        assert!(matches!(
            parse_document("[]"),
            Err(ImportError::IncompleteStructure)
        ));
        let doc = parse_document(r#"{"entries": [], "categories": "nope"}"#).unwrap();
        assert!(doc.categories.is_empty());
    }

    #[test]
    fn reconcile_adds_only_new_truthy_ids() {
        let existing = vec![Category::new("work", "Work", "bg-blue-500")];
        let imported = vec![
            json!({"id": "work", "name": "Other"}),
            json!({"id": "", "name": "Blank"}),
            json!({"name": "No id"}),
            json!({"id": 7}),
            json!({"id": "travel", "name": "Travel", "color": "bg-teal-500"}),
        ];
        let (cats, added) = reconcile_categories(&existing, &imported);
        assert_eq!(added, 2);
        assert_eq!(cats[0].name, "Work");
        assert_eq!(cats[1], Category::new("7", IMPORTED_FOLDER_NAME, DEFAULT_COLOR));
        assert_eq!(cats[2], Category::new("travel", "Travel", "bg-teal-500"));
    }

    #[test]
    fn normalization_fills_defaults() {
        let valid: HashSet<&str> = [UNCATEGORIZED_ID, "work"].into_iter().collect();
        let mut ids = counter();
        let entry = normalize_entry(
            &json!({"type": "pin", "value": 1234, "createdAt": "1700000000000"}),
            4,
            &valid,
            &no_existing(),
            &mut ids,
            99,
        )
        .unwrap();
        assert_eq!(entry.id, "gen-1");
        assert_eq!(entry.title, "Import #5");
        assert_eq!(entry.kind, EntryType::Pin);
        assert_eq!(entry.category_id, UNCATEGORIZED_ID);
        assert_eq!(entry.value, "1234");
        assert_eq!(entry.username, None);
        assert_eq!(entry.created_at, 1_700_000_000_000);
        assert_eq!(entry.last_modified, 1_700_000_000_000);
    }

    #[test]
    fn unknown_category_falls_back() {
        let valid: HashSet<&str> = [UNCATEGORIZED_ID, "work"].into_iter().collect();
        let mut ids = counter();
        let entry = normalize_entry(
            &json!({"id": "x", "categoryId": "ghost"}),
            0,
            &valid,
            &no_existing(),
            &mut ids,
            1,
        )
        .unwrap();
        assert_eq!(entry.category_id, UNCATEGORIZED_ID);
        let kept = normalize_entry(
            &json!({"id": "y", "categoryId": "work"}),
            1,
            &valid,
            &no_existing(),
            &mut ids,
            1,
        )
        .unwrap();
        assert_eq!(kept.category_id, "work");
    }

    #[test]
    fn falsy_records_are_skipped_but_keep_their_position() {
        let doc = ImportDocument {
            entries: vec![json!(null), json!(0), json!({"value": "v"})],
            categories: vec![],
        };
        let mut ids = counter();
        let plan = plan_import(&doc, &crate::models::default_categories(), &[], &mut ids, 5);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].title, "Import #3");
        assert_eq!(plan.novel, 1);
    }

    #[test]
    fn zero_and_garbage_timestamps_become_now() {
        assert_eq!(coerce_millis(Some(&json!(0))), None);
        assert_eq!(coerce_millis(Some(&json!("soon"))), None);
        assert_eq!(coerce_millis(Some(&json!(true))), None);
        assert_eq!(coerce_millis(Some(&json!(12.9))), Some(12));
        assert_eq!(coerce_millis(None), None);
    }

    fn mk(id: &str, created: i64, title: &str) -> VaultEntry {
        VaultEntry {
            id: id.into(),
            title: title.into(),
            kind: EntryType::Password,
            category_id: UNCATEGORIZED_ID.into(),
            username: None,
            issuer: None,
            value: String::new(),
            notes: None,
            created_at: created,
            last_modified: created,
        }
    }

    fn vault() -> VaultStore<MemoryStore> {
        VaultStore::open(MemoryStore::new(), SequentialIds::new("gen-"), ManualClock::at(500))
            .unwrap()
    }

    #[test]
    fn colliding_id_updates_only_the_fields_it_carries() {
        let existing = vec![
            VaultEntry {
                category_id: "work".into(),
                username: Some("me".into()),
                value: "pw".into(),
                ..mk("1", 100, "Old title")
            },
            mk("other", 50, "Other"),
        ];
        let doc = parse_document(
            r#"{"entries":[{"id":"1","title":"New title"},{"id":"2","type":"pin","value":"0000"}]}"#,
        )
        .unwrap();
        let mut ids = counter();
        let plan = plan_import(&doc, &crate::models::default_categories(), &existing, &mut ids, 900);

        assert_eq!(plan.novel, 1);
        assert_eq!(plan.updated, 1);
        assert_eq!(plan.entries.len(), existing.len() + plan.novel);

        let retitled = plan.entries.iter().find(|e| e.id == "1").unwrap();
        assert_eq!(retitled.title, "New title");
        assert_eq!(retitled.category_id, "work");
        assert_eq!(retitled.username.as_deref(), Some("me"));
        assert_eq!(retitled.value, "pw");
        assert_eq!(retitled.created_at, 100);
        assert_eq!(retitled.last_modified, 900);

        let added = plan.entries.iter().find(|e| e.id == "2").unwrap();
        assert_eq!(added.kind, EntryType::Pin);
        assert_eq!(added.category_id, UNCATEGORIZED_ID);
        assert_eq!(added.value, "0000");
    }

    #[test]
    fn malformed_patterns_are_skipped_and_valid_ones_canonicalized() {
        let mut store = vault();
        let mut filter = ViewFilter::default();
        let mut view = ActiveView::Vault;
        let summary = run_import(
            &mut store,
            &mut filter,
            &mut view,
            ImportSource::Text(
                r#"{"entries":[
                    {"id":"p","type":"pattern","value":"0,x,99"},
                    {"id":"q","type":"pattern","value":"2, 5,,8"}
                ]}"#
                .into(),
            ),
            &mut ImportLog::default(),
        )
        .unwrap();
        assert_eq!(summary.imported, 1);
        assert!(store.entry("p").is_none());
        assert_eq!(store.entry("q").unwrap().value, "2,5,8");
    }

    #[test]
    fn failed_commit_leaves_store_and_storage_unchanged() {
        let memory = MemoryStore::new();
        {
            let mut seeded =
                VaultStore::open(memory.clone(), SequentialIds::new("s-"), ManualClock::at(1))
                    .unwrap();
            seeded.create_entry(crate::models::EntryDraft::titled("Keep").value("x")).unwrap();
        }
        let entries_before = memory.raw(crate::storage::ENTRIES_KEY);
        let categories_before = memory.raw(crate::storage::CATEGORIES_KEY);

        let mut store = VaultStore::open(
            FailingStore::failing_on(memory.clone(), crate::storage::CATEGORIES_KEY),
            SequentialIds::new("gen-"),
            ManualClock::at(500),
        )
        .unwrap();
        let mut filter = ViewFilter {
            category: Some("work".into()),
            search: "ke".into(),
        };
        let mut view = ActiveView::Portals;
        let mut log = ImportLog::default();
        let result = run_import(
            &mut store,
            &mut filter,
            &mut view,
            ImportSource::Text(
                r#"{"entries":[{"id":"n","title":"New","categoryId":"trip"}],"categories":[{"id":"trip"}]}"#
                    .into(),
            ),
            &mut log,
        );

        assert!(matches!(result, Err(ImportError::Commit(_))));
        assert_eq!(store.entries().len(), 1);
        assert_eq!(store.categories().len(), 4);
        assert_eq!(memory.raw(crate::storage::ENTRIES_KEY), entries_before);
        assert_eq!(memory.raw(crate::storage::CATEGORIES_KEY), categories_before);
        let last = log.last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.stage, 5);
        assert_eq!(filter.search, "ke");
        assert_eq!(view, ActiveView::Portals);
    }

    #[test]
    fn merge_overlays_by_id_and_sorts_newest_first() {
        let existing = vec![mk("a", 10, "A"), mk("b", 30, "B")];
        let merged = merge_entries(&existing, vec![mk("a", 10, "A2"), mk("c", 20, "C")]);
        let order: Vec<(&str, &str)> = merged
            .iter()
            .map(|e| (e.id.as_str(), e.title.as_str()))
            .collect();
        assert_eq!(order, vec![("b", "B"), ("c", "C"), ("a", "A2")]);
    }
}
