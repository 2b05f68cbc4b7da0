//! On-disk config store at the destination root
//!
//! Holds the answers and domain keys of previous runs plus the record of
//! which blueprints produced the current output, so a re-run resolves the
//! same blueprints without asking again.

use crate::diagnostics::Diagnostic;
use crate::error::{GeneratorError, Result};
use crate::templates::migrate_legacy_keys;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// A blueprint that was resolved and applied to the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueprintRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generator_version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    blueprints: Vec<BlueprintRecord>,
    #[serde(flatten)]
    values: Map<String, Value>,
}

/// Config store loaded from, and written back to, the destination
#[derive(Debug, Clone)]
pub struct ConfigStore {
    file_name: PathBuf,
    file: ConfigFile,
}

impl ConfigStore {
    /// Empty store that will be written as `file_name`
    pub fn empty(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            file: ConfigFile::default(),
        }
    }

    /// Load `file_name` from `destination`; a missing file yields an empty store.
    pub fn load(destination: &Path, file_name: &str) -> Result<Self> {
        let path = destination.join(file_name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::empty(file_name))
            }
            Err(e) => return Err(e.into()),
        };
        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| GeneratorError::manifest(&path, e))?;
        Ok(Self {
            file_name: PathBuf::from(file_name),
            file,
        })
    }

    /// Destination-relative path of the store
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.file.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.file.values.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.file.values.insert(key.into(), value);
    }

    /// Set `key` only if it has no value yet
    pub fn set_default(&mut self, key: &str, value: Value) {
        if !self.contains(key) {
            self.set(key, value);
        }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.file.values
    }

    /// Move answers stored under legacy keys to their modern names.
    pub fn migrate_legacy_keys(&mut self) -> Vec<Diagnostic> {
        migrate_legacy_keys(&mut self.file.values)
    }

    /// Host version that produced the destination last time
    pub fn generator_version(&self) -> Option<&str> {
        self.file.generator_version.as_deref()
    }

    pub fn set_generator_version(&mut self, version: impl Into<String>) {
        self.file.generator_version = Some(version.into());
    }

    pub fn blueprints(&self) -> &[BlueprintRecord] {
        &self.file.blueprints
    }

    /// Merge applied blueprints into the record, updating versions in place.
    pub fn record_blueprints(&mut self, applied: &[BlueprintRecord]) {
        for record in applied {
            match self
                .file
                .blueprints
                .iter_mut()
                .find(|existing| existing.name == record.name)
            {
                Some(existing) => existing.version = record.version.clone(),
                None => self.file.blueprints.push(record.clone()),
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.file)
            .map_err(|e| GeneratorError::manifest(&self.file_name, e))?;
        json.push('\n');
        Ok(json)
    }
}
