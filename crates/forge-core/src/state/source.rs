//! The `source` sub-store: named helpers one generator offers to others
//!
//! A preparing task registers a helper; later phases call it by name to edit
//! destination files owned by the generator that registered it.

use crate::fs::MemFs;
use crate::generator::Namespace;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Helper callable by later phases
pub type SourceHelper = Arc<dyn Fn(&mut MemFs, &Value) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
pub struct Source {
    helpers: BTreeMap<String, (Namespace, SourceHelper)>,
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `helper` under `name`, replacing any previous owner.
    pub fn register<F>(&mut self, name: impl Into<String>, owner: Namespace, helper: F)
    where
        F: Fn(&mut MemFs, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), (owner, Arc::new(helper)));
    }

    pub fn get(&self, name: &str) -> Option<SourceHelper> {
        self.helpers.get(name).map(|(_, helper)| helper.clone())
    }

    /// Namespace that registered `name`
    pub fn owner(&self, name: &str) -> Option<&Namespace> {
        self.helpers.get(name).map(|(owner, _)| owner)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.helpers.iter().map(|(name, (owner, _))| (name, owner)))
            .finish()
    }
}
