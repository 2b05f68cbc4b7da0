//! The `application` and `entities` sub-stores

use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Resolved project configuration derived from the config store
#[derive(Debug, Clone, Default)]
pub struct Application {
    values: Map<String, Value>,
}

impl Application {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Fill keys that are not set yet.
    pub fn merge_defaults(&mut self, defaults: &Map<String, Value>) {
        for (key, value) in defaults {
            if !self.values.contains_key(key) {
                self.values.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// One entity definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// The entity as template data: its fields plus `name`
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        Value::Object(map)
    }
}

/// Entities keyed by name, iterated in name order
#[derive(Debug, Clone, Default)]
pub struct Entities {
    entities: BTreeMap<String, Entity>,
}

impl Entities {
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Load every `*.json` entity definition under `dir`. A missing
    /// directory loads nothing. Returns the number of entities loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let content = std::fs::read_to_string(path)?;
            let mut value: Value =
                serde_json::from_str(&content).map_err(|e| GeneratorError::manifest(path, e))?;
            if value.get("name").is_none() {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                if let Value::Object(map) = &mut value {
                    map.insert("name".to_string(), Value::String(stem));
                }
            }
            let entity: Entity =
                serde_json::from_value(value).map_err(|e| GeneratorError::manifest(path, e))?;
            self.insert(entity);
            loaded += 1;
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_defaults_keeps_existing() {
        let mut app = Application::default();
        app.set("baseName", json!("shop"));
        let Value::Object(defaults) = json!({"baseName": "other", "port": 8080}) else {
            unreachable!()
        };
        app.merge_defaults(&defaults);
        assert_eq!(app.get_str("baseName"), Some("shop"));
        assert_eq!(app.get("port"), Some(&json!(8080)));
    }

    #[test]
    fn test_entities_iterate_in_name_order() {
        let mut entities = Entities::default();
        entities.insert(Entity::new("Order"));
        entities.insert(Entity::new("Book"));
        let names: Vec<&str> = entities.names().collect();
        assert_eq!(names, vec!["Book", "Order"]);
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Book.json"),
            r#"{"fields": [{"name": "title"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("author.json"), r#"{"name": "Author"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut entities = Entities::default();
        assert_eq!(entities.load_dir(dir.path()).unwrap(), 2);
        assert!(entities.get("Author").is_some());
        let book = entities.get("Book").unwrap();
        assert_eq!(book.to_value()["fields"][0]["name"], json!("title"));
        assert_eq!(book.to_value()["name"], json!("Book"));

        let missing = dir.path().join("nope");
        assert_eq!(Entities::default().load_dir(&missing).unwrap(), 0);
    }
}
