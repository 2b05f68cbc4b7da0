//! Generator definitions and their composed instances
//!
//! A [`Generator`] is a definition: it knows its feature flags, its template
//! root and how to fill a [`TaskRegistry`]. Instantiating it for a run yields
//! a [`GeneratorInstance`] the scheduler can compose.

pub mod instance;
pub mod tasks;

pub use instance::{Augments, GeneratorFeatures, GeneratorInstance, Namespace};
pub use tasks::{EachEntityFn, RunFn, Task, TaskBody, TaskFuture, TaskRegistry};

use crate::error::Result;
use crate::templates::TemplateRoot;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A generator module
pub trait Generator: Send + Sync {
    /// Declared feature flags (only `side_by_side` is read from a definition)
    fn features(&self) -> GeneratorFeatures {
        GeneratorFeatures::default()
    }

    /// Root of this generator's own templates
    fn template_root(&self) -> Option<TemplateRoot> {
        None
    }

    /// Declare tasks for every phase this generator implements.
    fn register_tasks(&self, tasks: &mut TaskRegistry) -> Result<()>;
}

/// Generator definitions keyed by sub-command
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sub_command: impl Into<String>, generator: Arc<dyn Generator>) {
        self.generators.insert(sub_command.into(), generator);
    }

    pub fn with(mut self, sub_command: impl Into<String>, generator: Arc<dyn Generator>) -> Self {
        self.register(sub_command, generator);
        self
    }

    pub fn get(&self, sub_command: &str) -> Option<&Arc<dyn Generator>> {
        self.generators.get(sub_command)
    }

    pub fn sub_commands(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.generators.keys()).finish()
    }
}
