use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED_ID: &str = "uncategorized";
pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_COLOR: &str = "bg-slate-500";

/// Swatches offered when creating a folder.
pub const CATEGORY_PALETTE: [&str; 16] = [
    "bg-blue-500",
    "bg-purple-500",
    "bg-pink-500",
    "bg-red-500",
    "bg-orange-500",
    "bg-amber-500",
    "bg-yellow-500",
    "bg-lime-500",
    "bg-green-500",
    "bg-emerald-500",
    "bg-teal-500",
    "bg-cyan-500",
    "bg-indigo-500",
    "bg-violet-500",
    "bg-fuchsia-500",
    "bg-rose-500",
];

pub fn new_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    // set version 4 and variant bits
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryType {
    #[default]
    #[serde(rename = "Password")]
    Password,
    #[serde(rename = "PIN")]
    Pin,
    #[serde(rename = "Pattern")]
    Pattern,
    #[serde(rename = "Seed Phrase")]
    SeedPhrase,
    #[serde(rename = "Secret Key")]
    SecretKey,
}

impl EntryType {
    pub const ALL: [EntryType; 5] = [
        EntryType::Password,
        EntryType::Pin,
        EntryType::Pattern,
        EntryType::SeedPhrase,
        EntryType::SecretKey,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntryType::Password => "Password",
            EntryType::Pin => "PIN",
            EntryType::Pattern => "Pattern",
            EntryType::SeedPhrase => "Seed Phrase",
            EntryType::SecretKey => "Secret Key",
        }
    }

    /// Password and Pattern entries carry an account name.
    pub fn uses_username(self) -> bool {
        matches!(self, EntryType::Password | EntryType::Pattern)
    }

    pub fn uses_issuer(self) -> bool {
        matches!(self, EntryType::SecretKey)
    }

    pub fn next(self) -> EntryType {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> EntryType {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.id == UNCATEGORIZED_ID
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new(UNCATEGORIZED_ID, "General", DEFAULT_COLOR),
        Category::new("work", "Work", "bg-blue-500"),
        Category::new("personal", "Personal", "bg-purple-500"),
        Category::new("crypto", "Crypto Assets", "bg-amber-500"),
    ]
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: EntryType,
    #[serde(default = "uncategorized")]
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub last_modified: i64,
}

fn uncategorized() -> String {
    UNCATEGORIZED_ID.to_string()
}

/// Partial entry as produced by the entry form. `None` leaves a field alone on
/// update and falls back to its default on create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: Option<String>,
    pub kind: Option<EntryType>,
    pub category_id: Option<String>,
    pub username: Option<String>,
    pub issuer: Option<String>,
    pub value: Option<String>,
    pub notes: Option<String>,
}

impl EntryDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: EntryType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn category(mut self, id: impl Into<String>) -> Self {
        self.category_id = Some(id.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Collapses whitespace runs, trims and lowercases a seed phrase.
pub fn normalize_seed_phrase(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalLink {
    pub id: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    pub description: &'static str,
}

pub const PORTALS: [PortalLink; 2] = [
    PortalLink {
        id: "1",
        title: "OmniPro",
        url: "https://omni-ruby.vercel.app/",
        description: "All-in-one productivity hub: finances, meeting timelines and task management in one adaptive dashboard.",
    },
    PortalLink {
        id: "2",
        title: "DreamFund",
        url: "https://wishlist-eight-mu.vercel.app/",
        description: "Wishlist and savings tracker that keeps every record locally in your browser.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_has_v4_shape() {
        let id = new_uuid();
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'4');
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn entry_type_uses_display_names_on_the_wire() {
        let json = serde_json::to_string(&EntryType::SeedPhrase).unwrap();
        assert_eq!(json, "\"Seed Phrase\"");
        let back: EntryType = serde_json::from_str("\"PIN\"").unwrap();
        assert_eq!(back, EntryType::Pin);
    }

    #[test]
    fn entry_serializes_camel_case_and_omits_empty_optionals() {
        let entry = VaultEntry {
            id: "a".into(),
            title: "Gmail".into(),
            kind: EntryType::Password,
            category_id: "work".into(),
            username: None,
            issuer: None,
            value: "hunter2".into(),
            notes: None,
            created_at: 1,
            last_modified: 2,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["categoryId"], "work");
        assert_eq!(value["lastModified"], 2);
        assert_eq!(value["type"], "Password");
        assert!(value.get("username").is_none());
    }

    #[test]
    fn seed_phrase_normalization() {
        assert_eq!(
            normalize_seed_phrase("  Apple   BANANA\tcherry \n"),
            "apple banana cherry"
        );
    }

    #[test]
    fn entry_type_cycles_through_all_variants() {
        let mut t = EntryType::Password;
        for _ in 0..EntryType::ALL.len() {
            t = t.next();
        }
        assert_eq!(t, EntryType::Password);
        assert_eq!(EntryType::Password.prev(), EntryType::SecretKey);
    }
}
