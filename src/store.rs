//! Entry and category collections with write-through persistence.
//!
//! Every mutation rewrites both collections in the backing
//! [`KeyValueStore`]. The in-memory collections only change once both
//! writes have gone through.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::models::{
    Category, DEFAULT_TITLE, EntryDraft, EntryType, UNCATEGORIZED_ID, VaultEntry,
    default_categories, new_uuid, non_empty, normalize_seed_phrase,
};
use crate::pattern;
use crate::storage::{CATEGORIES_KEY, ENTRIES_KEY, KeyValueStore};

pub trait IdSource {
    fn next_id(&mut self) -> String;
}

pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> String {
        new_uuid()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Deterministic ids: `<prefix>1`, `<prefix>2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    prefix: String,
    next: u64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn at(ms: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: i64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStats {
    pub total: usize,
    pub by_type: Vec<(EntryType, usize)>,
}

pub struct VaultStore<S> {
    storage: S,
    ids: Box<dyn IdSource>,
    clock: Box<dyn Clock>,
    entries: Vec<VaultEntry>,
    categories: Vec<Category>,
}

impl<S: KeyValueStore> VaultStore<S> {
    /// Loads persisted collections. A vault that never saved categories gets
    /// the default folders; the fallback folder is always present.
    pub fn open(
        storage: S,
        ids: impl IdSource + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self, StoreError> {
        let entries: Vec<VaultEntry> = match storage.get(ENTRIES_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: ENTRIES_KEY,
                source,
            })?,
            None => Vec::new(),
        };
        let mut categories: Vec<Category> = match storage.get(CATEGORIES_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                key: CATEGORIES_KEY,
                source,
            })?,
            None => default_categories(),
        };
        if !categories.iter().any(Category::is_system) {
            let fallback = default_categories().remove(0);
            categories.insert(0, fallback);
        }
        info!(
            entries = entries.len(),
            categories = categories.len(),
            "vault loaded"
        );
        Ok(Self {
            storage,
            ids: Box::new(ids),
            clock: Box::new(clock),
            entries,
            categories,
        })
    }

    pub fn entries(&self) -> &[VaultEntry] {
        &self.entries
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn entry(&self, id: &str) -> Option<&VaultEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn count_in_category(&self, id: &str) -> usize {
        self.entries.iter().filter(|e| e.category_id == id).count()
    }

    pub fn stats(&self) -> EntryStats {
        EntryStats {
            total: self.entries.len(),
            by_type: EntryType::ALL
                .iter()
                .map(|t| (*t, self.entries.iter().filter(|e| e.kind == *t).count()))
                .collect(),
        }
    }

    pub fn fresh_id(&mut self) -> String {
        self.ids.next_id()
    }

    pub fn now(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn create_entry(&mut self, draft: EntryDraft) -> Result<VaultEntry, StoreError> {
        let now = self.now();
        let kind = draft.kind.unwrap_or_default();
        let mut entry = VaultEntry {
            id: self.fresh_id(),
            title: non_empty(draft.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            kind,
            category_id: non_empty(draft.category_id)
                .unwrap_or_else(|| UNCATEGORIZED_ID.to_string()),
            username: non_empty(draft.username),
            issuer: non_empty(draft.issuer),
            value: draft.value.unwrap_or_default(),
            notes: non_empty(draft.notes),
            created_at: now,
            last_modified: now,
        };
        normalize_value(&mut entry)?;
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(entry.clone());
        entries.extend(self.entries.iter().cloned());
        self.commit(self.categories.clone(), entries)?;
        info!(entry_id = %entry.id, kind = %entry.kind, "entry created");
        Ok(entry)
    }

    /// Applies the provided draft fields to the entry with `id`. Unknown ids
    /// are ignored and nothing is written.
    pub fn update_entry(
        &mut self,
        id: &str,
        draft: EntryDraft,
    ) -> Result<Option<VaultEntry>, StoreError> {
        let now = self.now();
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            debug!(entry_id = %id, "update skipped, no such entry");
            return Ok(None);
        };
        let mut entry = self.entries[pos].clone();
        if let Some(title) = draft.title {
            entry.title = non_empty(Some(title)).unwrap_or_else(|| DEFAULT_TITLE.to_string());
        }
        if let Some(kind) = draft.kind {
            entry.kind = kind;
        }
        if let Some(category_id) = non_empty(draft.category_id) {
            entry.category_id = category_id;
        }
        if draft.username.is_some() {
            entry.username = non_empty(draft.username);
        }
        if draft.issuer.is_some() {
            entry.issuer = non_empty(draft.issuer);
        }
        if let Some(value) = draft.value {
            entry.value = value;
        }
        if draft.notes.is_some() {
            entry.notes = non_empty(draft.notes);
        }
        entry.last_modified = now.max(entry.created_at);
        normalize_value(&mut entry)?;
        let mut entries = self.entries.clone();
        entries[pos] = entry.clone();
        self.commit(self.categories.clone(), entries)?;
        info!(entry_id = %entry.id, "entry updated");
        Ok(Some(entry))
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<bool, StoreError> {
        if self.entry(id).is_none() {
            return Ok(false);
        }
        let entries = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(self.categories.clone(), entries)?;
        info!(entry_id = %id, "entry deleted");
        Ok(true)
    }

    pub fn create_category(&mut self, name: &str, color: &str) -> Result<Category, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyCategoryName);
        }
        let category = Category::new(self.fresh_id(), name, color);
        let mut categories = self.categories.clone();
        categories.push(category.clone());
        self.commit(categories, self.entries.clone())?;
        info!(category_id = %category.id, "folder created");
        Ok(category)
    }

    /// Removes a folder after moving its entries to `reassign_to`. Entries
    /// go to the fallback folder when no usable target is given. Returns how
    /// many entries moved. The fallback folder itself is never removed.
    pub fn delete_category(
        &mut self,
        id: &str,
        reassign_to: Option<&str>,
    ) -> Result<usize, StoreError> {
        if id == UNCATEGORIZED_ID || self.category(id).is_none() {
            return Ok(0);
        }
        let target = reassign_to
            .filter(|t| *t != id && self.category(t).is_some())
            .unwrap_or(UNCATEGORIZED_ID)
            .to_string();

        let mut moved = 0;
        let mut entries = self.entries.clone();
        for entry in entries.iter_mut().filter(|e| e.category_id == id) {
            entry.category_id = target.clone();
            moved += 1;
        }
        let categories = self.categories.iter().filter(|c| c.id != id).cloned().collect();
        self.commit(categories, entries)?;
        info!(category_id = %id, target = %target, moved, "folder deleted");
        Ok(moved)
    }

    /// Wholesale replacement, used when committing an import.
    pub fn replace_all(
        &mut self,
        categories: Vec<Category>,
        entries: Vec<VaultEntry>,
    ) -> Result<(), StoreError> {
        self.commit(categories, entries)
    }

    /// Writes both collections, then adopts them. Folders are written first;
    /// if the entries write fails the previous folder list is put back, and
    /// memory keeps the old collections either way.
    fn commit(
        &mut self,
        categories: Vec<Category>,
        entries: Vec<VaultEntry>,
    ) -> Result<(), StoreError> {
        let categories_json = serde_json::to_string(&categories).map_err(|source| {
            StoreError::Serialize {
                key: CATEGORIES_KEY,
                source,
            }
        })?;
        let entries_json = serde_json::to_string(&entries).map_err(|source| {
            StoreError::Serialize {
                key: ENTRIES_KEY,
                source,
            }
        })?;
        let previous_categories = self.storage.get(CATEGORIES_KEY)?;
        self.storage.set(CATEGORIES_KEY, &categories_json)?;
        if let Err(err) = self.storage.set(ENTRIES_KEY, &entries_json) {
            let restored = match &previous_categories {
                Some(raw) => self.storage.set(CATEGORIES_KEY, raw),
                None => self.storage.remove(CATEGORIES_KEY),
            };
            if let Err(restore_err) = restored {
                warn!(error = %restore_err, "could not restore folders after failed write");
            }
            return Err(err.into());
        }
        self.categories = categories;
        self.entries = entries;
        debug!(
            entries = self.entries.len(),
            categories = self.categories.len(),
            "vault persisted"
        );
        Ok(())
    }
}

/// Seed phrases are normalized; pattern values must decode and are stored
/// in canonical form.
fn normalize_value(entry: &mut VaultEntry) -> Result<(), StoreError> {
    match entry.kind {
        EntryType::SeedPhrase => entry.value = normalize_seed_phrase(&entry.value),
        EntryType::Pattern => entry.value = pattern::encode(&pattern::decode(&entry.value)?),
        _ => {}
    }
    Ok(())
}

/// Form-level check before a save: a title and a value are required, except
/// that a pattern may be saved empty.
pub fn validate_draft(draft: &EntryDraft) -> Result<(), StoreError> {
    let has_title = draft.title.as_deref().is_some_and(|t| !t.trim().is_empty());
    let kind = draft.kind.unwrap_or_default();
    let has_value = draft.value.as_deref().is_some_and(|v| !v.is_empty());
    if !has_title || (!has_value && kind != EntryType::Pattern) {
        return Err(StoreError::MissingRequiredField);
    }
    if kind == EntryType::Pattern {
        pattern::decode(draft.value.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FailingStore, MemoryStore};

    fn store_at(ms: i64) -> (VaultStore<MemoryStore>, MemoryStore, ManualClock) {
        let storage = MemoryStore::new();
        let clock = ManualClock::at(ms);
        let store =
            VaultStore::open(storage.clone(), SequentialIds::new("id-"), clock.clone()).unwrap();
        (store, storage, clock)
    }

    #[test]
    fn fresh_vault_has_default_folders_and_no_entries() {
        let (store, storage, _) = store_at(0);
        assert!(store.entries().is_empty());
        assert_eq!(store.categories().len(), 4);
        assert_eq!(store.categories()[0].id, UNCATEGORIZED_ID);
        assert!(storage.raw(ENTRIES_KEY).is_none());
    }

    #[test]
    fn create_fills_defaults_and_prepends() {
        let (mut store, storage, clock) = store_at(1_000);
        let first = store.create_entry(EntryDraft::default()).unwrap();
        clock.advance(5);
        let second = store.create_entry(EntryDraft::titled("Bank").kind(EntryType::Pin)).unwrap();

        assert_eq!(first.title, DEFAULT_TITLE);
        assert_eq!(first.kind, EntryType::Password);
        assert_eq!(first.category_id, UNCATEGORIZED_ID);
        assert_eq!(first.created_at, 1_000);
        assert_eq!(first.last_modified, 1_000);
        assert_eq!(store.entries()[0].id, second.id);
        assert_eq!(store.entries()[1].id, first.id);

        let persisted: Vec<VaultEntry> =
            serde_json::from_str(&storage.raw(ENTRIES_KEY).unwrap()).unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn update_merges_fields_and_keeps_identity() {
        let (mut store, _, clock) = store_at(100);
        let created = store
            .create_entry(EntryDraft::titled("Gmail").value("old").username("me"))
            .unwrap();
        clock.set(250);
        let updated = store
            .update_entry(
                &created.id,
                EntryDraft {
                    value: Some("new".into()),
                    ..EntryDraft::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, 100);
        assert_eq!(updated.last_modified, 250);
        assert_eq!(updated.title, "Gmail");
        assert_eq!(updated.username.as_deref(), Some("me"));
        assert_eq!(updated.value, "new");
    }

    #[test]
    fn last_modified_never_precedes_creation() {
        let (mut store, _, clock) = store_at(500);
        let created = store.create_entry(EntryDraft::titled("x")).unwrap();
        clock.set(10);
        let updated = store
            .update_entry(&created.id, EntryDraft::titled("y"))
            .unwrap()
            .unwrap();
        assert_eq!(updated.last_modified, 500);
    }

    #[test]
    fn update_and_delete_of_unknown_id_are_silent() {
        let (mut store, storage, _) = store_at(0);
        assert!(store.update_entry("nope", EntryDraft::titled("x")).unwrap().is_none());
        assert!(!store.delete_entry("nope").unwrap());
        assert!(storage.raw(ENTRIES_KEY).is_none());
    }

    #[test]
    fn seed_phrases_are_normalized_on_save() {
        let (mut store, _, _) = store_at(0);
        let entry = store
            .create_entry(
                EntryDraft::titled("Wallet")
                    .kind(EntryType::SeedPhrase)
                    .value("  Abandon  ABILITY\table "),
            )
            .unwrap();
        assert_eq!(entry.value, "abandon ability able");
    }

    #[test]
    fn category_requires_a_name() {
        let (mut store, _, _) = store_at(0);
        assert!(matches!(
            store.create_category("   ", "bg-red-500"),
            Err(StoreError::EmptyCategoryName)
        ));
        let cat = store.create_category(" Social ", "bg-red-500").unwrap();
        assert_eq!(cat.name, "Social");
        assert_eq!(store.categories().last().unwrap().id, cat.id);
    }

    #[test]
    fn deleting_a_folder_reassigns_members_first() {
        let (mut store, _, _) = store_at(0);
        store.create_entry(EntryDraft::titled("a").category("work")).unwrap();
        store.create_entry(EntryDraft::titled("b").category("work")).unwrap();
        store.create_entry(EntryDraft::titled("c").category("crypto")).unwrap();

        let moved = store.delete_category("work", Some("personal")).unwrap();
        assert_eq!(moved, 2);
        assert_eq!(store.count_in_category("work"), 0);
        assert_eq!(store.count_in_category("personal"), 2);
        assert!(store.category("work").is_none());
    }

    #[test]
    fn deleting_without_target_falls_back_to_general() {
        let (mut store, _, _) = store_at(0);
        store.create_entry(EntryDraft::titled("a").category("work")).unwrap();
        store.delete_category("work", None).unwrap();
        assert_eq!(store.count_in_category(UNCATEGORIZED_ID), 1);
        store.create_entry(EntryDraft::titled("b").category("crypto")).unwrap();
        store.delete_category("crypto", Some("crypto")).unwrap();
        assert_eq!(store.count_in_category(UNCATEGORIZED_ID), 2);
    }

    #[test]
    fn fallback_folder_cannot_be_deleted() {
        let (mut store, _, _) = store_at(0);
        store.create_entry(EntryDraft::titled("a")).unwrap();
        assert_eq!(store.delete_category(UNCATEGORIZED_ID, Some("work")).unwrap(), 0);
        assert!(store.category(UNCATEGORIZED_ID).is_some());
        assert_eq!(store.count_in_category(UNCATEGORIZED_ID), 1);
    }

    #[test]
    fn reopen_reads_what_was_written() {
        let (mut store, storage, _) = store_at(42);
        store.create_entry(EntryDraft::titled("Router").kind(EntryType::Pin).value("1234")).unwrap();
        store.create_category("Home", "bg-green-500").unwrap();

        let reopened = VaultStore::open(storage, RandomIds, SystemClock).unwrap();
        assert_eq!(reopened.entries(), store.entries());
        assert_eq!(reopened.categories(), store.categories());
    }

    #[test]
    fn loaded_categories_always_include_fallback() {
        let mut storage = MemoryStore::new();
        storage
            .set(CATEGORIES_KEY, r#"[{"id":"work","name":"Work","color":"bg-blue-500"}]"#)
            .unwrap();
        let store = VaultStore::open(storage, RandomIds, SystemClock).unwrap();
        assert_eq!(store.categories()[0].id, UNCATEGORIZED_ID);
        assert_eq!(store.categories().len(), 2);
    }

    #[test]
    fn corrupt_storage_is_reported() {
        let mut storage = MemoryStore::new();
        storage.set(ENTRIES_KEY, "{not json").unwrap();
        assert!(matches!(
            VaultStore::open(storage, RandomIds, SystemClock),
            Err(StoreError::Corrupt { key: ENTRIES_KEY, .. })
        ));
    }

    #[test]
    fn stats_count_per_type() {
        let (mut store, _, _) = store_at(0);
        store.create_entry(EntryDraft::titled("a")).unwrap();
        store.create_entry(EntryDraft::titled("b").kind(EntryType::Pin)).unwrap();
        store.create_entry(EntryDraft::titled("c").kind(EntryType::Pin)).unwrap();
        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert!(stats.by_type.contains(&(EntryType::Pin, 2)));
        assert!(stats.by_type.contains(&(EntryType::Pattern, 0)));
    }

    #[test]
    fn draft_validation() {
        assert!(validate_draft(&EntryDraft::titled("x").value("v")).is_ok());
        assert!(validate_draft(&EntryDraft::titled("x")).is_err());
        assert!(validate_draft(&EntryDraft::titled("x").kind(EntryType::Pattern)).is_ok());
        assert!(validate_draft(&EntryDraft::default().value("v")).is_err());
        assert!(matches!(
            validate_draft(&EntryDraft::titled("x").kind(EntryType::Pattern).value("1,a")),
            Err(StoreError::InvalidPattern(_))
        ));
    }

    #[test]
    fn pattern_values_are_checked_and_canonicalized() {
        let (mut store, storage, _) = store_at(0);
        let rejected = store.create_entry(
            EntryDraft::titled("Phone").kind(EntryType::Pattern).value("0,x,99"),
        );
        assert!(matches!(rejected, Err(StoreError::InvalidPattern(_))));
        assert!(store.entries().is_empty());
        assert!(storage.raw(ENTRIES_KEY).is_none());

        let phone = store
            .create_entry(EntryDraft::titled("Phone").kind(EntryType::Pattern).value(" 0, 4,,8 "))
            .unwrap();
        assert_eq!(phone.value, "0,4,8");

        let bad_update = store.update_entry(
            &phone.id,
            EntryDraft {
                value: Some("3,9".into()),
                ..EntryDraft::default()
            },
        );
        assert!(matches!(bad_update, Err(StoreError::InvalidPattern(_))));
        assert_eq!(store.entry(&phone.id).unwrap().value, "0,4,8");
    }

    #[test]
    fn failed_write_changes_neither_memory_nor_disk() {
        let memory = MemoryStore::new();
        let mut store = VaultStore::open(
            FailingStore::failing_on(memory.clone(), ENTRIES_KEY),
            SequentialIds::new("id-"),
            ManualClock::at(0),
        )
        .unwrap();

        assert!(store.create_entry(EntryDraft::titled("a").value("1")).is_err());
        assert!(store.entries().is_empty());
        assert!(store.create_category("Trip", "bg-red-500").is_err());
        assert_eq!(store.categories().len(), 4);
        // the folder write went through first and was rolled back
        assert!(memory.raw(CATEGORIES_KEY).is_none());
        assert!(memory.raw(ENTRIES_KEY).is_none());
    }

    #[test]
    fn failed_folder_delete_keeps_folder_and_members() {
        let memory = MemoryStore::new();
        {
            let mut seeded =
                VaultStore::open(memory.clone(), SequentialIds::new("id-"), ManualClock::at(0))
                    .unwrap();
            seeded.create_entry(EntryDraft::titled("a").value("1").category("work")).unwrap();
        }
        let entries_before = memory.raw(ENTRIES_KEY);
        let categories_before = memory.raw(CATEGORIES_KEY);

        let mut store = VaultStore::open(
            FailingStore::failing_on(memory.clone(), ENTRIES_KEY),
            SequentialIds::new("id-"),
            ManualClock::at(0),
        )
        .unwrap();
        assert!(store.delete_category("work", Some("personal")).is_err());
        assert!(store.category("work").is_some());
        assert_eq!(store.count_in_category("work"), 1);
        assert_eq!(memory.raw(ENTRIES_KEY), entries_before);
        assert_eq!(memory.raw(CATEGORIES_KEY), categories_before);

        let mut store = VaultStore::open(
            FailingStore::failing_on(memory.clone(), CATEGORIES_KEY),
            SequentialIds::new("id-"),
            ManualClock::at(0),
        )
        .unwrap();
        assert!(store.delete_category("work", None).is_err());
        assert_eq!(store.count_in_category("work"), 1);
        assert_eq!(memory.raw(ENTRIES_KEY), entries_before);
    }
}
