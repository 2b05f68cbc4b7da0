#![allow(dead_code)]

use forge_core::blueprint::PackageManifest;
use forge_core::generator::GeneratorFeatures;
use forge_core::{
    BlueprintCatalog, BlueprintPackage, Environment, Generator, GeneratorRegistry, HostInfo, Task,
    TaskRegistry, TemplateRoot,
};
use std::path::PathBuf;
use std::sync::Arc;

pub const HOST_PACKAGE: &str = "generator-forge";
pub const HOST_VERSION: &str = "7.1.0";

type Setup = Arc<dyn Fn(&mut TaskRegistry) -> forge_core::Result<()> + Send + Sync>;

/// Generator whose tasks are declared by a closure
#[derive(Clone)]
pub struct TestGenerator {
    features: GeneratorFeatures,
    root: Option<TemplateRoot>,
    setup: Setup,
}

impl TestGenerator {
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn(&mut TaskRegistry) -> forge_core::Result<()> + Send + Sync + 'static,
    {
        Self {
            features: GeneratorFeatures::default(),
            root: None,
            setup: Arc::new(setup),
        }
    }

    pub fn side_by_side(mut self) -> Self {
        self.features.side_by_side = true;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(TemplateRoot::Directory(root.into()));
        self
    }
}

impl Generator for TestGenerator {
    fn features(&self) -> GeneratorFeatures {
        self.features
    }

    fn template_root(&self) -> Option<TemplateRoot> {
        self.root.clone()
    }

    fn register_tasks(&self, tasks: &mut TaskRegistry) -> forge_core::Result<()> {
        (self.setup)(tasks)
    }
}

pub fn noop(name: &str) -> Task {
    Task::new(name, |_ctx| Box::pin(async { Ok(()) }))
}

pub fn host() -> HostInfo {
    HostInfo::new(HOST_PACKAGE, HOST_VERSION).unwrap()
}

/// In-process blueprint package declaring `range` against the host
pub fn blueprint(name: &str, range: &str, sub_command: &str, generator: TestGenerator) -> BlueprintPackage {
    BlueprintPackage::new(
        name,
        PackageManifest::new(name, "1.0.0").with_dependency(HOST_PACKAGE, range),
        GeneratorRegistry::new().with(sub_command, Arc::new(generator)),
    )
}

pub fn environment(base: TestGenerator, catalog: BlueprintCatalog) -> Environment {
    Environment::builder(host())
        .generators(GeneratorRegistry::new().with("app", Arc::new(base)))
        .catalog(catalog)
        .build()
}
