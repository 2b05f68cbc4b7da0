//! A generator module as it participates in one run

use super::tasks::TaskRegistry;
use super::Generator;
use crate::error::Result;
use crate::phase::Phase;
use crate::templates::TemplateRoot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique generator identity, `prefix:sub-command`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self(namespace.into())
    }

    pub fn from_parts(prefix: &str, sub_command: &str) -> Self {
        Self(format!("{}:{}", prefix, sub_command))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Package-derived prefix before the `:`
    pub fn prefix(&self) -> &str {
        self.0.rsplit_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }

    pub fn sub_command(&self) -> &str {
        self.0.rsplit_once(':').map(|(_, s)| s).unwrap_or("")
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Feature flags of a composed instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorFeatures {
    /// Augments the base generator instead of replacing it
    pub side_by_side: bool,
    /// Base generator whose work was handed to a blueprint
    pub delegates_to_blueprint: bool,
    /// Instantiated from a blueprint package
    pub from_blueprint: bool,
}

/// Snapshot of the generator a blueprint augments or overrides
#[derive(Debug, Clone)]
pub struct Augments {
    pub namespace: Namespace,
    /// Template roots of the base, used as lookup fallback
    pub template_roots: Vec<TemplateRoot>,
}

/// One generator instantiated for a run
///
/// Built mutable during composition, then frozen behind an `Arc` once the
/// scheduler owns it.
#[derive(Debug, Clone)]
pub struct GeneratorInstance {
    namespace: Namespace,
    features: GeneratorFeatures,
    tasks: TaskRegistry,
    template_roots: Vec<TemplateRoot>,
    augments: Option<Augments>,
}

impl GeneratorInstance {
    /// Instantiate a generator definition.
    pub fn instantiate(
        namespace: Namespace,
        definition: &dyn Generator,
        augments: Option<Augments>,
    ) -> Result<Self> {
        let mut tasks = TaskRegistry::new();
        definition.register_tasks(&mut tasks)?;

        let mut features = definition.features();
        features.from_blueprint = augments.is_some();
        features.delegates_to_blueprint = false;

        Ok(Self {
            namespace,
            features,
            tasks,
            template_roots: definition.template_root().into_iter().collect(),
            augments,
        })
    }

    /// Instance built directly from a task registry
    pub fn from_tasks(namespace: impl Into<String>, tasks: TaskRegistry) -> Self {
        Self {
            namespace: Namespace::new(namespace),
            features: GeneratorFeatures::default(),
            tasks,
            template_roots: Vec::new(),
            augments: None,
        }
    }

    pub fn with_features(mut self, features: GeneratorFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_template_root(mut self, root: TemplateRoot) -> Self {
        self.template_roots.push(root);
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn features(&self) -> GeneratorFeatures {
        self.features
    }

    pub fn is_side_by_side(&self) -> bool {
        self.features.side_by_side
    }

    pub fn augments(&self) -> Option<&Augments> {
        self.augments.as_ref()
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Tasks this instance contributes to `phase`
    pub fn collect(&self, phase: Phase) -> &[crate::generator::Task] {
        self.tasks.collect(phase)
    }

    pub fn template_roots(&self) -> &[TemplateRoot] {
        &self.template_roots
    }

    /// Own roots followed by the augmented generator's roots
    pub fn template_candidates(&self) -> Vec<TemplateRoot> {
        let mut candidates = self.template_roots.clone();
        if let Some(augments) = &self.augments {
            for root in &augments.template_roots {
                if !candidates.contains(root) {
                    candidates.push(root.clone());
                }
            }
        }
        candidates
    }

    /// Back-reference handed to blueprints of this instance
    pub fn as_augments(&self) -> Augments {
        Augments {
            namespace: self.namespace.clone(),
            template_roots: self.template_candidates(),
        }
    }

    /// Hand the generator over to a blueprint: only identity tasks remain.
    pub fn into_delegated(mut self) -> Self {
        self.tasks = self.tasks.identity_only();
        self.features.delegates_to_blueprint = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Task;
    use std::path::PathBuf;

    #[test]
    fn test_namespace_parts() {
        let ns = Namespace::new("@acme/forge-foo:app");
        assert_eq!(ns.prefix(), "@acme/forge-foo");
        assert_eq!(ns.sub_command(), "app");
        assert_eq!(Namespace::from_parts("forge", "common").as_str(), "forge:common");
    }

    #[test]
    fn test_template_candidates_fall_back_to_base() {
        let base = GeneratorInstance::from_tasks("forge:app", TaskRegistry::new())
            .with_template_root(TemplateRoot::Directory(PathBuf::from("/base")));
        let mut blueprint = GeneratorInstance::from_tasks("forge-foo:app", TaskRegistry::new())
            .with_template_root(TemplateRoot::Directory(PathBuf::from("/blueprint")));
        blueprint.augments = Some(base.as_augments());

        assert_eq!(
            blueprint.template_candidates(),
            vec![
                TemplateRoot::Directory(PathBuf::from("/blueprint")),
                TemplateRoot::Directory(PathBuf::from("/base")),
            ]
        );
    }

    #[test]
    fn test_into_delegated_keeps_identity_tasks() {
        let mut tasks = TaskRegistry::new();
        tasks
            .register_identity(Task::new("identity", |_ctx| Box::pin(async { Ok(()) })))
            .unwrap();
        tasks
            .register(
                Phase::Writing,
                Task::new("write", |_ctx| Box::pin(async { Ok(()) })),
            )
            .unwrap();

        let delegated = GeneratorInstance::from_tasks("forge:app", tasks).into_delegated();
        assert!(delegated.features().delegates_to_blueprint);
        assert_eq!(delegated.collect(Phase::Initializing).len(), 1);
        assert!(delegated.collect(Phase::Writing).is_empty());
    }
}
