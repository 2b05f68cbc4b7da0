//! Values handed to task functions
//!
//! Every task receives one context. It carries the sub-stores its phase
//! declares, the file store, and the composition handle, and refuses access
//! to sub-stores the phase does not pass.

use super::Composition;
use crate::diagnostics::Diagnostic;
use crate::environment::Services;
use crate::error::{GeneratorError, Result};
use crate::fs::{MemFs, StagedWrite};
use crate::generator::{GeneratorInstance, Namespace};
use crate::host::HostInfo;
use crate::phase::{Phase, PhaseSpec, SubStore};
use crate::prompts::{Prompter, Question};
use crate::state::{Application, Control, Entities, Entity, RunOptions, SharedRunState, Source};
use crate::templates::{RenderOptions, TemplateData, TemplateRoot};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Context of a task invoked once per run
pub struct TaskContext<'a> {
    spec: PhaseSpec,
    instance: Arc<GeneratorInstance>,
    task: &'a str,
    state: &'a mut SharedRunState,
    fs: &'a mut MemFs,
    composition: &'a mut Composition,
    services: &'a Services,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        spec: PhaseSpec,
        instance: Arc<GeneratorInstance>,
        task: &'a str,
        state: &'a mut SharedRunState,
        fs: &'a mut MemFs,
        composition: &'a mut Composition,
        services: &'a Services,
    ) -> Self {
        Self {
            spec,
            instance,
            task,
            state,
            fs,
            composition,
            services,
        }
    }

    pub fn phase(&self) -> Phase {
        self.spec.phase
    }

    pub fn task_name(&self) -> &str {
        self.task
    }

    pub fn namespace(&self) -> &Namespace {
        self.instance.namespace()
    }

    pub fn instance(&self) -> &Arc<GeneratorInstance> {
        &self.instance
    }

    pub fn host(&self) -> &HostInfo {
        &self.services.host
    }

    /// Frozen options of this run
    pub fn options(&self) -> Arc<RunOptions> {
        self.state.control.options().clone()
    }

    fn allow(&self, store: SubStore) -> Result<()> {
        if self.spec.args.allows(store) {
            Ok(())
        } else {
            Err(GeneratorError::ShapeViolation {
                phase: self.spec.phase,
                store,
            })
        }
    }

    pub fn control(&self) -> Result<&Control> {
        self.allow(SubStore::Control)?;
        Ok(&self.state.control)
    }

    pub fn control_mut(&mut self) -> Result<&mut Control> {
        self.allow(SubStore::Control)?;
        Ok(&mut self.state.control)
    }

    pub fn source(&self) -> Result<&Source> {
        self.allow(SubStore::Source)?;
        Ok(&self.state.source)
    }

    pub fn source_mut(&mut self) -> Result<&mut Source> {
        self.allow(SubStore::Source)?;
        Ok(&mut self.state.source)
    }

    pub fn application(&self) -> Result<&Application> {
        self.allow(SubStore::Application)?;
        Ok(&self.state.application)
    }

    pub fn application_mut(&mut self) -> Result<&mut Application> {
        self.allow(SubStore::Application)?;
        Ok(&mut self.state.application)
    }

    pub fn entities(&self) -> Result<&Entities> {
        self.allow(SubStore::Entities)?;
        Ok(&self.state.entities)
    }

    pub fn entities_mut(&mut self) -> Result<&mut Entities> {
        self.allow(SubStore::Entities)?;
        Ok(&mut self.state.entities)
    }

    pub fn fs(&self) -> &MemFs {
        &*self.fs
    }

    pub fn fs_mut(&mut self) -> &mut MemFs {
        &mut *self.fs
    }

    /// Destination directory of the run
    pub fn destination(&self) -> PathBuf {
        self.state.control.options().destination.clone()
    }

    /// Call a helper another generator registered in `source`.
    pub fn call_source(&mut self, name: &str, args: &Value) -> anyhow::Result<()> {
        self.allow(SubStore::Source)?;
        let helper = self
            .state
            .source
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("No source helper named `{}`", name))?;
        helper(&mut *self.fs, args)
    }

    /// Record a non-fatal condition in the run report.
    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        self.composition.report(diagnostic);
    }

    /// Ask `questions` whose answers are not stored yet and store the answers
    /// in the config store. Non-interactive runs take each question's default.
    pub fn prompt(&mut self, questions: &[Question]) -> anyhow::Result<()> {
        self.allow(SubStore::Control)?;
        let interactive = self.state.control.options().interactive;
        for question in questions {
            if self.state.control.config().contains(&question.name) {
                continue;
            }
            let answer = if interactive {
                self.services.prompter.ask(question)?
            } else {
                question.default_answer()
            };
            self.state.control.config_mut().set(question.name.clone(), answer);
        }
        Ok(())
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.services.prompter.as_ref()
    }

    /// Roots searched for this instance's templates: side-by-side overlays
    /// first, then its own roots, then the roots of what it augments.
    pub fn template_candidates(&self) -> Vec<TemplateRoot> {
        self.composition.template_candidates(&self.instance)
    }

    /// Template data visible to this phase: config values, then
    /// `application` when the phase passes it.
    pub fn template_data(&self) -> TemplateData {
        let mut root: Map<String, Value> = self.state.control.config().values().clone();
        if self.spec.args.application {
            for (key, value) in self.state.application.as_map() {
                root.insert(key.clone(), value.clone());
            }
        }
        TemplateData::new(root).with(
            "generatorVersion",
            json!(self.services.host.version().to_string()),
        )
    }

    /// Render `template` into `destination` with the phase's template data.
    pub async fn render(&mut self, template: &str, destination: &str) -> anyhow::Result<()> {
        let data = self.template_data();
        self.render_with(template, destination, &data, RenderOptions::default())
            .await
    }

    pub async fn render_with(
        &mut self,
        template: &str,
        destination: &str,
        data: &TemplateData,
        options: RenderOptions,
    ) -> anyhow::Result<()> {
        let candidates = self.template_candidates();
        let content = self
            .services
            .templates
            .render(&candidates, template, data, options)
            .await?;
        self.fs.write_destination(destination, content);
        for notice in data.take_notices() {
            self.diagnostic(notice);
        }
        Ok(())
    }

    /// Compose a built-in generator together with its configured blueprints.
    pub fn compose_with(&mut self, sub_command: &str) -> Result<Arc<GeneratorInstance>> {
        self.composition
            .compose_generator(self.services, &self.state.control, sub_command)
    }

    /// Compose the configured blueprints of `sub_command` against this
    /// task's own instance. Delegate blueprints take over its pending tasks.
    pub fn compose_with_blueprints(
        &mut self,
        sub_command: &str,
    ) -> Result<Vec<Arc<GeneratorInstance>>> {
        self.composition.compose_blueprints(
            self.services,
            &self.state.control,
            &self.instance,
            sub_command,
        )
    }

    /// Compose an already-built instance.
    pub fn compose(&mut self, instance: GeneratorInstance) -> Result<Arc<GeneratorInstance>> {
        self.composition.compose(instance)
    }

    /// Run an external command in the destination directory. Skipped when
    /// the run was started with `skip_install`.
    pub async fn spawn_command(&mut self, program: &str, args: &[&str]) -> anyhow::Result<bool> {
        let options = self.options();
        if options.skip_install {
            tracing::info!(program, "skipping command, install disabled");
            return Ok(false);
        }
        self.services
            .commands
            .run(&options.destination, program, args)
            .await?;
        Ok(true)
    }
}

/// Context of a task invoked once per entity
pub struct EntityContext<'a> {
    pub(crate) phase: Phase,
    pub(crate) namespace: &'a Namespace,
    pub(crate) entity: &'a mut Entity,
    pub(crate) application: &'a Application,
    pub(crate) control: &'a Control,
    pub(crate) staged: &'a mut Vec<StagedWrite>,
    pub(crate) notices: &'a mut Vec<Diagnostic>,
    pub(crate) candidates: &'a [TemplateRoot],
    pub(crate) services: &'a Services,
}

impl<'a> EntityContext<'a> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    pub fn entity(&self) -> &Entity {
        &*self.entity
    }

    /// This entity only; other entities are owned by their own invocations
    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut *self.entity
    }

    pub fn application(&self) -> &Application {
        self.application
    }

    pub fn control(&self) -> &Control {
        self.control
    }

    /// Stage a write; staged writes are merged in entity-name order.
    pub fn write(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.staged.push(StagedWrite {
            path: path.into(),
            content: content.into(),
        });
    }

    /// Application data plus `entity`
    pub fn template_data(&self) -> TemplateData {
        TemplateData::new(self.application.as_map().clone())
            .with("entity", self.entity.to_value())
            .with(
                "generatorVersion",
                json!(self.services.host.version().to_string()),
            )
    }

    pub async fn render(&mut self, template: &str, destination: &str) -> anyhow::Result<()> {
        let data = self.template_data();
        let content = self
            .services
            .templates
            .render(self.candidates, template, &data, RenderOptions::default())
            .await?;
        self.write(destination, content);
        self.notices.extend(data.take_notices());
        Ok(())
    }
}
