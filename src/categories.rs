/// Flood level category registry.
///
/// Defines the ordered set of severity categories a reporter can pick when
/// they report flooding, along with the text shown for each one. The
/// consensus engine and chat handler only ever look categories up through a
/// `CategoryTable`, so adding a category is a registry (or config) change and
/// never touches the algorithm.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Category metadata
// ---------------------------------------------------------------------------

/// Display metadata for a single level category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LevelCategory {
    /// Form value and stored key, e.g. `"car"`.
    pub key: String,
    /// Short label shown next to the status headline.
    pub label: String,
    /// Status message used when this category wins consensus.
    pub status_message: String,
    /// Localized label used in chat replies.
    pub chat_label: String,
}

/// Static registry entry. Converted into an owned `LevelCategory` when a
/// table is built so config-supplied categories share one type.
struct BuiltinCategory {
    key: &'static str,
    label: &'static str,
    status_message: &'static str,
    chat_label: &'static str,
}

/// Default categories, ordered from least to most severe.
static BUILTIN_CATEGORIES: &[BuiltinCategory] = &[
    BuiltinCategory {
        key: "walkable",
        label: "walkable",
        status_message: "Flooding reported, but streets remain walkable. Avoid low spots.",
        chat_label: "ยังสามารถเดินผ่านได้",
    },
    BuiltinCategory {
        key: "motorcycle",
        label: "Motorcycle can't pass",
        status_message: "Flooding confirmed and deep enough to stop motorcycles. Seek alternate routes.",
        chat_label: "รถจักรยานยนต์ผ่านไม่ได้",
    },
    BuiltinCategory {
        key: "car",
        label: "Car can't pass",
        status_message: "Severe flooding reported. Roads are impassable for cars—avoid the area.",
        chat_label: "รถยนต์ผ่านไม่ได้",
    },
];

// ---------------------------------------------------------------------------
// Category table
// ---------------------------------------------------------------------------

/// Ordered, immutable category table shared by the engine, the form
/// validator, the chat handler and the page renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    entries: Vec<LevelCategory>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        CategoryTable {
            entries: BUILTIN_CATEGORIES
                .iter()
                .map(|c| LevelCategory {
                    key: c.key.to_string(),
                    label: c.label.to_string(),
                    status_message: c.status_message.to_string(),
                    chat_label: c.chat_label.to_string(),
                })
                .collect(),
        }
    }
}

impl CategoryTable {
    /// Builds a table from configured entries. Callers are expected to have
    /// validated key uniqueness (see `config::Config::validate`).
    pub fn new(entries: Vec<LevelCategory>) -> Self {
        CategoryTable { entries }
    }

    /// Looks up a category by key. Returns `None` if not found.
    pub fn find(&self, key: &str) -> Option<&LevelCategory> {
        self.entries.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelCategory> {
        self.entries.iter()
    }

    /// All keys in table order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_has_three_categories_in_severity_order() {
        let table = CategoryTable::default();
        assert_eq!(table.keys(), vec!["walkable", "motorcycle", "car"]);
    }

    #[test]
    fn test_no_duplicate_keys_in_builtin_registry() {
        let mut seen = std::collections::HashSet::new();
        for category in BUILTIN_CATEGORIES {
            assert!(
                seen.insert(category.key),
                "duplicate category key '{}' found in BUILTIN_CATEGORIES",
                category.key
            );
        }
    }

    #[test]
    fn test_keys_are_lowercase_ascii_form_values() {
        // Keys are submitted verbatim as form values and stored as text.
        for category in BUILTIN_CATEGORIES {
            assert!(
                category.key.chars().all(|c| c.is_ascii_lowercase()),
                "category key '{}' should be lowercase ascii",
                category.key
            );
        }
    }

    #[test]
    fn test_find_returns_correct_entry() {
        let table = CategoryTable::default();
        let car = table.find("car").expect("car should be in the default table");
        assert_eq!(car.label, "Car can't pass");
        assert!(car.status_message.starts_with("Severe flooding"));
    }

    #[test]
    fn test_find_returns_none_for_unknown_key() {
        let table = CategoryTable::default();
        assert!(table.find("boat").is_none());
        assert!(!table.contains(""));
    }

    #[test]
    fn test_every_category_has_all_display_text() {
        for category in CategoryTable::default().iter() {
            assert!(!category.label.is_empty(), "{} has no label", category.key);
            assert!(!category.status_message.is_empty(), "{} has no message", category.key);
            assert!(!category.chat_label.is_empty(), "{} has no chat label", category.key);
        }
    }

    #[test]
    fn test_configured_table_replaces_builtin_entries() {
        let table = CategoryTable::new(vec![LevelCategory {
            key: "boat".to_string(),
            label: "Boat only".to_string(),
            status_message: "Only boats can pass.".to_string(),
            chat_label: "เรือเท่านั้น".to_string(),
        }]);
        assert_eq!(table.len(), 1);
        assert!(table.contains("boat"));
        assert!(!table.contains("car"));
    }
}
