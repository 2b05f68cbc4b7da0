//! Blueprint generators declared in YAML
//!
//! A package on disk declares each sub-generator in
//! `generators/<sub>/generator.yaml` next to a `templates/` directory:
//!
//! ```yaml
//! sideBySide: true
//! application:
//!   authenticationType: jwt
//! files:
//!   - source: README.md.ejs
//! entityFiles:
//!   - source: entity.md.ejs
//!     dest: docs/{entity}.md
//! ```

use crate::error::{GeneratorError, Result};
use crate::generator::{Generator, GeneratorFeatures, Task, TaskRegistry};
use crate::phase::Phase;
use crate::templates::{render::destination_for, TemplateRoot};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub const GENERATOR_FILE: &str = "generator.yaml";
pub const TEMPLATES_DIR: &str = "templates";

/// Placeholder replaced by the entity name in entity file destinations
const ENTITY_PLACEHOLDER: &str = "{entity}";

/// A template rendered into the destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFile {
    /// Template path relative to the template roots
    pub source: String,

    /// Destination path (defaults to source without `.ejs`)
    #[serde(default)]
    pub dest: Option<String>,
}

impl TemplateFile {
    pub fn destination(&self) -> &str {
        self.dest
            .as_deref()
            .unwrap_or_else(|| destination_for(&self.source))
    }
}

/// Parsed `generator.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorManifest {
    #[serde(default)]
    pub side_by_side: bool,

    /// Defaults merged into `application` during loading
    #[serde(default)]
    pub application: Map<String, Value>,

    #[serde(default)]
    pub files: Vec<TemplateFile>,

    /// Rendered once per entity; `{entity}` in `dest` is the entity name
    #[serde(default)]
    pub entity_files: Vec<TemplateFile>,
}

impl GeneratorManifest {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(GENERATOR_FILE);
        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content).map_err(|e| GeneratorError::manifest(path, e))
    }
}

/// Generator built from a [`GeneratorManifest`]
#[derive(Debug, Clone)]
pub struct DeclarativeGenerator {
    manifest: Arc<GeneratorManifest>,
    template_root: Option<TemplateRoot>,
}

impl DeclarativeGenerator {
    pub fn new(manifest: GeneratorManifest, template_root: Option<TemplateRoot>) -> Self {
        Self {
            manifest: Arc::new(manifest),
            template_root,
        }
    }

    /// Load `generator.yaml` and use `templates/` beside it as the root.
    pub fn load(dir: &Path) -> Result<Self> {
        let manifest = GeneratorManifest::load(dir)?;
        let templates = dir.join(TEMPLATES_DIR);
        let root = templates.is_dir().then(|| TemplateRoot::Directory(templates));
        Ok(Self::new(manifest, root))
    }

    pub fn manifest(&self) -> &GeneratorManifest {
        &self.manifest
    }
}

impl Generator for DeclarativeGenerator {
    fn features(&self) -> GeneratorFeatures {
        GeneratorFeatures {
            side_by_side: self.manifest.side_by_side,
            ..Default::default()
        }
    }

    fn template_root(&self) -> Option<TemplateRoot> {
        self.template_root.clone()
    }

    fn register_tasks(&self, tasks: &mut TaskRegistry) -> Result<()> {
        if !self.manifest.application.is_empty() {
            let manifest = self.manifest.clone();
            tasks.register(
                Phase::Loading,
                Task::new("loadApplicationDefaults", move |mut ctx| {
                    let manifest = manifest.clone();
                    Box::pin(async move {
                        ctx.application_mut()?.merge_defaults(&manifest.application);
                        Ok(())
                    })
                }),
            )?;
        }

        if !self.manifest.files.is_empty() {
            let manifest = self.manifest.clone();
            tasks.register(
                Phase::Writing,
                Task::new("writeFiles", move |mut ctx| {
                    let manifest = manifest.clone();
                    Box::pin(async move {
                        for file in &manifest.files {
                            ctx.render(&file.source, file.destination()).await?;
                        }
                        Ok(())
                    })
                }),
            )?;
        }

        if !self.manifest.entity_files.is_empty() {
            let manifest = self.manifest.clone();
            tasks.register(
                Phase::Writing,
                Task::each_entity("writeEntityFiles", move |mut ctx| {
                    let manifest = manifest.clone();
                    Box::pin(async move {
                        for file in &manifest.entity_files {
                            let dest = file
                                .destination()
                                .replace(ENTITY_PLACEHOLDER, &ctx.entity().name);
                            ctx.render(&file.source, &dest).await?;
                        }
                        Ok(())
                    })
                }),
            )?;
        }

        Ok(())
    }
}
