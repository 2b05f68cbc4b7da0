//! Where blueprint packages come from
//!
//! Packages are either registered in-process or found on disk under search
//! paths, laid out as `<path>/<package>/package.json` plus one directory per
//! sub-generator under `<path>/<package>/generators/`.

use super::declarative::{DeclarativeGenerator, GENERATOR_FILE};
use super::manifest::{PackageManifest, MANIFEST_FILE};
use crate::error::Result;
use crate::generator::{Generator, GeneratorRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const GENERATORS_DIR: &str = "generators";

/// A loaded blueprint package
#[derive(Debug, Clone)]
pub struct BlueprintPackage {
    name: String,
    manifest: PackageManifest,
    generators: GeneratorRegistry,
    location: Option<PathBuf>,
}

impl BlueprintPackage {
    /// Package defined in code
    pub fn new(name: impl Into<String>, manifest: PackageManifest, generators: GeneratorRegistry) -> Self {
        Self {
            name: name.into(),
            manifest,
            generators,
            location: None,
        }
    }

    /// Load a declarative package from `dir`. `None` when `dir` has no manifest.
    pub fn load(dir: &Path, fallback_name: &str) -> Result<Option<Self>> {
        let Some(manifest) = PackageManifest::load(dir)? else {
            return Ok(None);
        };

        let mut generators = GeneratorRegistry::new();
        let generators_dir = dir.join(GENERATORS_DIR);
        if generators_dir.is_dir() {
            for entry in WalkDir::new(&generators_dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.path().join(GENERATOR_FILE).is_file() {
                    continue;
                }
                let sub_command = entry.file_name().to_string_lossy().to_string();
                let generator = DeclarativeGenerator::load(entry.path())?;
                generators.register(sub_command, Arc::new(generator) as Arc<dyn Generator>);
            }
        }

        let name = manifest
            .name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string());
        Ok(Some(Self {
            name,
            manifest,
            generators,
            location: Some(dir.to_path_buf()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    /// Sub-generator registered under `sub_command`
    pub fn generator(&self, sub_command: &str) -> Option<&Arc<dyn Generator>> {
        self.generators.get(sub_command)
    }

    pub fn sub_commands(&self) -> impl Iterator<Item = &str> {
        self.generators.sub_commands()
    }

    /// Directory the package was loaded from
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

/// Blueprint packages available to a host
#[derive(Debug, Clone, Default)]
pub struct BlueprintCatalog {
    registered: BTreeMap<String, Arc<BlueprintPackage>>,
    search_paths: Vec<PathBuf>,
}

impl BlueprintCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, package: BlueprintPackage) {
        self.registered
            .insert(package.name().to_string(), Arc::new(package));
    }

    pub fn with_package(mut self, package: BlueprintPackage) -> Self {
        self.register(package);
        self
    }

    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.add_search_path(path);
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find a package by its normalized name. Registered packages win over
    /// packages on disk; search paths are tried in order.
    pub fn locate(&self, name: &str) -> Result<Option<Arc<BlueprintPackage>>> {
        if let Some(package) = self.registered.get(name) {
            return Ok(Some(package.clone()));
        }
        for path in &self.search_paths {
            let dir = path.join(name);
            if !dir.is_dir() {
                continue;
            }
            if let Some(package) = BlueprintPackage::load(&dir, name)? {
                tracing::debug!(package = name, dir = %dir.display(), "loaded blueprint package");
                return Ok(Some(Arc::new(package)));
            }
        }
        Ok(None)
    }

    /// Every package reachable from this catalog, sorted by name
    pub fn discover(&self) -> Result<Vec<Arc<BlueprintPackage>>> {
        let mut found: BTreeMap<String, Arc<BlueprintPackage>> = self.registered.clone();

        for path in &self.search_paths {
            for entry in WalkDir::new(path)
                .min_depth(1)
                .max_depth(2)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_dir() || !entry.path().join(MANIFEST_FILE).is_file() {
                    continue;
                }
                let fallback = entry
                    .path()
                    .strip_prefix(path)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                if let Some(package) = BlueprintPackage::load(entry.path(), &fallback)? {
                    found
                        .entry(package.name().to_string())
                        .or_insert_with(|| Arc::new(package));
                }
            }
        }

        Ok(found.into_values().collect())
    }
}
