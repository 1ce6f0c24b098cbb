//! Named template and preset storage
//!
//! Plain in-memory maps owned by one session. Names are trimmed before use;
//! saving under an existing name overwrites it silently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Provide a name to save the {0}.")]
    EmptyName(&'static str),
}

/// A saved protocol type + instruction pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub protocol_type: String,
    pub instruction: String,
}

#[derive(Debug, Clone)]
pub struct NamedStore<V> {
    kind: &'static str,
    entries: BTreeMap<String, V>,
}

impl<V: Clone> NamedStore<V> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite. Returns the trimmed name the value was stored under.
    pub fn save(&mut self, name: &str, value: V) -> Result<String, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName(self.kind));
        }
        self.entries.insert(name.to_string(), value);
        Ok(name.to_string())
    }

    /// `None` is the not-found sentinel
    pub fn load(&self, name: &str) -> Option<V> {
        self.entries.get(name.trim()).cloned()
    }

    /// Remove if present; returns whether anything was removed
    pub fn delete(&mut self, name: &str) -> bool {
        self.entries.remove(name.trim()).is_some()
    }

    /// All names, sorted
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Instruction templates and full presets, kept in separate namespaces
#[derive(Debug, Clone)]
pub struct TemplateStore {
    pub templates: NamedStore<String>,
    pub presets: NamedStore<Preset>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self {
            templates: NamedStore::new("template"),
            presets: NamedStore::new("preset"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_overwrite_delete() {
        let mut store = NamedStore::new("template");

        store.save("digest", "v1".to_string()).unwrap();
        assert_eq!(store.load("digest"), Some("v1".to_string()));

        store.save("digest", "v2".to_string()).unwrap();
        assert_eq!(store.load("digest"), Some("v2".to_string()));
        assert_eq!(store.len(), 1);

        assert!(store.delete("digest"));
        assert_eq!(store.load("digest"), None);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut store: NamedStore<String> = NamedStore::new("template");
        store.save("keep", "x".to_string()).unwrap();
        assert!(!store.delete("absent"));
        assert_eq!(store.list(), vec!["keep"]);
    }

    #[test]
    fn test_blank_name_rejected_without_mutation() {
        let mut store = NamedStore::new("preset");
        let err = store
            .save("   ", Preset { protocol_type: "PCR".into(), instruction: "x".into() })
            .unwrap_err();

        assert_eq!(err, StoreError::EmptyName("preset"));
        assert_eq!(err.to_string(), "Provide a name to save the preset.");
        assert!(store.is_empty());
    }

    #[test]
    fn test_names_are_trimmed() {
        let mut store = NamedStore::new("template");
        assert_eq!(store.save("  my template ", "x".to_string()).unwrap(), "my template");
        assert_eq!(store.load("my template"), Some("x".to_string()));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut store = TemplateStore::default();
        store.templates.save("shared", "instruction".to_string()).unwrap();
        store
            .presets
            .save("shared", Preset { protocol_type: "PCR".into(), instruction: "other".into() })
            .unwrap();

        store.templates.delete("shared");
        assert!(store.templates.load("shared").is_none());
        assert_eq!(store.presets.load("shared").unwrap().instruction, "other");
    }

    #[test]
    fn test_list_sorted() {
        let mut store = NamedStore::new("template");
        for name in ["b", "a", "c"] {
            store.save(name, String::new()).unwrap();
        }
        assert_eq!(store.list(), vec!["a", "b", "c"]);
    }
}
