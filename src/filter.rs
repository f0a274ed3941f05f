use crate::models::VaultEntry;

/// Which top-level screen the main window shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Vault,
    Portals,
}

/// Folder selection plus title search. Both conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub category: Option<String>,
    pub search: String,
}

impl ViewFilter {
    pub fn matches(&self, entry: &VaultEntry) -> bool {
        let in_category = self
            .category
            .as_deref()
            .is_none_or(|id| entry.category_id == id);
        in_category && title_contains(&entry.title, &self.search)
    }

    /// Matching entries, in store order.
    pub fn apply<'a>(&self, entries: &'a [VaultEntry]) -> Vec<&'a VaultEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.search.is_empty()
    }

    pub fn clear(&mut self) {
        self.category = None;
        self.search.clear();
    }

    /// Drops the folder selection if it points at a folder that is going away.
    pub fn forget_category(&mut self, id: &str) {
        if self.category.as_deref() == Some(id) {
            self.category = None;
        }
    }
}

fn title_contains(title: &str, needle: &str) -> bool {
    needle.is_empty() || title.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;

    fn entry(id: &str, title: &str, category: &str) -> VaultEntry {
        VaultEntry {
            id: id.into(),
            title: title.into(),
            kind: EntryType::Password,
            category_id: category.into(),
            username: None,
            issuer: None,
            value: String::new(),
            notes: None,
            created_at: 0,
            last_modified: 0,
        }
    }

    fn sample() -> Vec<VaultEntry> {
        vec![
            entry("1", "Gmail Work", "work"),
            entry("2", "gmail personal", "personal"),
            entry("3", "Bank PIN", "personal"),
            entry("4", "Office wifi", "work"),
        ]
    }

    fn ids(found: Vec<&VaultEntry>) -> Vec<&str> {
        found.into_iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_filter_returns_everything_in_order() {
        let entries = sample();
        let filter = ViewFilter::default();
        assert!(filter.is_empty());
        assert_eq!(ids(filter.apply(&entries)), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn search_is_case_insensitive_on_title() {
        let entries = sample();
        let filter = ViewFilter {
            category: None,
            search: "GMAIL".into(),
        };
        assert_eq!(ids(filter.apply(&entries)), vec!["1", "2"]);
    }

    #[test]
    fn category_and_search_are_anded() {
        let entries = sample();
        let filter = ViewFilter {
            category: Some("personal".into()),
            search: "gmail".into(),
        };
        assert_eq!(ids(filter.apply(&entries)), vec!["2"]);
    }

    #[test]
    fn exhaustive_filter_agrees_with_predicate() {
        let entries = sample();
        for category in [None, Some("work"), Some("personal"), Some("missing")] {
            for search in ["", "g", "PIN", "wifi", "zzz"] {
                let filter = ViewFilter {
                    category: category.map(str::to_string),
                    search: search.to_string(),
                };
                let expected: Vec<&str> = entries
                    .iter()
                    .filter(|e| category.is_none_or(|c| e.category_id == c))
                    .filter(|e| e.title.to_lowercase().contains(&search.to_lowercase()))
                    .map(|e| e.id.as_str())
                    .collect();
                assert_eq!(ids(filter.apply(&entries)), expected);
            }
        }
    }

    #[test]
    fn forget_category_only_clears_matching_selection() {
        let mut filter = ViewFilter {
            category: Some("work".into()),
            search: "x".into(),
        };
        filter.forget_category("personal");
        assert_eq!(filter.category.as_deref(), Some("work"));
        filter.forget_category("work");
        assert!(filter.category.is_none());
        assert_eq!(filter.search, "x");
        filter.clear();
        assert!(filter.is_empty());
    }
}
