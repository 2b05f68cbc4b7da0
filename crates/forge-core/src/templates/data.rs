//! Data handed to templates
//!
//! Legacy key names are served through an explicit mapping table: a lookup of
//! a renamed key resolves the modern value and records one deprecation
//! notice per key.

use crate::diagnostics::Diagnostic;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Renamed template data keys, `(legacy, modern)`
pub const DEPRECATED_KEYS: &[(&str, &str)] = &[
    ("projectName", "baseName"),
    ("capitalizedBaseName", "baseNameCapitalized"),
    ("dasherizedBaseName", "baseNameKebab"),
    ("clientPackageManager", "packageManager"),
];

fn modern_key(legacy: &str) -> Option<(usize, &'static str)> {
    DEPRECATED_KEYS
        .iter()
        .position(|(old, _)| *old == legacy)
        .map(|index| (index, DEPRECATED_KEYS[index].1))
}

/// Move values stored under legacy keys to their modern names.
///
/// A modern value already present wins; the legacy entry is dropped either way.
pub fn migrate_legacy_keys(values: &mut Map<String, Value>) -> Vec<Diagnostic> {
    let mut notices = Vec::new();
    for &(legacy, modern) in DEPRECATED_KEYS {
        if let Some(value) = values.remove(legacy) {
            values.entry(modern.to_string()).or_insert(value);
            notices.push(Diagnostic::DeprecatedTemplateKey { legacy, modern });
        }
    }
    notices
}

/// Template data with deprecation-aware lookup
#[derive(Debug)]
pub struct TemplateData {
    root: Map<String, Value>,
    used_legacy: Mutex<BTreeSet<usize>>,
}

impl TemplateData {
    pub fn new(root: Map<String, Value>) -> Self {
        Self {
            root,
            used_legacy: Mutex::new(BTreeSet::new()),
        }
    }

    /// Add or replace a top-level key
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.root.insert(key.into(), value);
        self
    }

    /// Resolve a dotted path such as `entity.name`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;

        let mut current = match self.root.get(first) {
            Some(value) => value,
            None => {
                let (index, modern) = modern_key(first)?;
                let value = self.root.get(modern)?;
                if let Ok(mut used) = self.used_legacy.lock() {
                    used.insert(index);
                }
                value
            }
        };

        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Deprecation notices recorded by lookups so far
    pub fn take_notices(&self) -> Vec<Diagnostic> {
        let Ok(mut used) = self.used_legacy.lock() else {
            return Vec::new();
        };
        std::mem::take(&mut *used)
            .into_iter()
            .map(|index| {
                let (legacy, modern) = DEPRECATED_KEYS[index];
                Diagnostic::DeprecatedTemplateKey { legacy, modern }
            })
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> TemplateData {
        match value {
            Value::Object(map) => TemplateData::new(map),
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn test_dotted_lookup() {
        let data = data(json!({"entity": {"name": "Book", "fields": ["title"]}}));
        assert_eq!(data.lookup("entity.name"), Some(&json!("Book")));
        assert_eq!(data.lookup("entity.fields.0"), Some(&json!("title")));
        assert_eq!(data.lookup("entity.missing"), None);
        assert!(data.take_notices().is_empty());
    }

    #[test]
    fn test_legacy_key_resolves_modern_value_once() {
        let data = data(json!({"baseName": "shop"}));
        assert_eq!(data.lookup("projectName"), Some(&json!("shop")));
        assert_eq!(data.lookup("projectName"), Some(&json!("shop")));

        let notices = data.take_notices();
        assert_eq!(
            notices,
            vec![Diagnostic::DeprecatedTemplateKey {
                legacy: "projectName",
                modern: "baseName"
            }]
        );
        assert!(data.take_notices().is_empty());
    }

    #[test]
    fn test_migrate_legacy_keys() {
        let mut values = Map::new();
        values.insert("projectName".into(), json!("old"));
        values.insert("clientPackageManager".into(), json!("yarn"));
        values.insert("packageManager".into(), json!("pnpm"));

        let notices = migrate_legacy_keys(&mut values);
        assert_eq!(notices.len(), 2);
        assert_eq!(values.get("baseName"), Some(&json!("old")));
        assert_eq!(values.get("packageManager"), Some(&json!("pnpm")));
        assert!(!values.contains_key("projectName"));
        assert!(!values.contains_key("clientPackageManager"));
    }
}
