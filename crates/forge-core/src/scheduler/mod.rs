//! The phase scheduler
//!
//! Composition adds generator instances to one [`RunQueue`]; a run drains the
//! queue phase by phase in registry order. Tasks execute one at a time,
//! except per-entity tasks of phases that allow concurrent fan-out.

pub mod context;
pub mod queue;

pub use context::{EntityContext, TaskContext};
pub use queue::{QueueEntry, RunQueue};

use crate::blueprint::{negotiate, BlueprintResolver};
use crate::diagnostics::Diagnostic;
use crate::environment::Services;
use crate::error::{GeneratorError, Result};
use crate::fs::{MemFs, StagedWrite};
use crate::generator::{GeneratorInstance, Namespace, TaskBody};
use crate::phase::{Phase, PhaseRegistry, PhaseSpec};
use crate::state::{Application, BlueprintRecord, Control, SharedRunState};
use crate::templates::TemplateRoot;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One task that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedTask {
    pub phase: Phase,
    pub namespace: Namespace,
    pub task: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// In execution order
    pub executed: Vec<ExecutedTask>,
    /// Blueprints applied to the destination
    pub applied_blueprints: Vec<BlueprintRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Files written by the commit step
    pub files_written: usize,
}

impl RunReport {
    /// Executed `(phase, namespace, task)` triples as strings, for assertions and logs
    pub fn trace(&self) -> Vec<String> {
        self.executed
            .iter()
            .map(|t| format!("{}:{}:{}", t.phase, t.namespace, t.task))
            .collect()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

/// Everything composed into a run so far
#[derive(Debug, Default)]
pub struct Composition {
    queue: RunQueue,
    instances: Vec<Arc<GeneratorInstance>>,
    /// Side-by-side blueprint roots searched before a base's own
    overlays: BTreeMap<Namespace, Vec<TemplateRoot>>,
    applied: Vec<BlueprintRecord>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    executed: Vec<ExecutedTask>,
}

impl Composition {
    /// Instances in composition order
    pub fn instances(&self) -> &[Arc<GeneratorInstance>] {
        &self.instances
    }

    pub fn queue(&self) -> &RunQueue {
        &self.queue
    }

    /// Record a diagnostic in the run report. A deprecated template key is
    /// reported once per run however many renders read it.
    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        if matches!(diagnostic, Diagnostic::DeprecatedTemplateKey { .. })
            && self.diagnostics.contains(&diagnostic)
        {
            return;
        }
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    /// Instance already composed under `namespace`
    pub fn composed(&self, namespace: &Namespace) -> Option<&Arc<GeneratorInstance>> {
        self.instances.iter().find(|i| i.namespace() == namespace)
    }

    /// Add one instance's tasks to the queue. An instance whose namespace
    /// is already composed is not added again; the existing one is returned.
    pub fn compose(&mut self, instance: GeneratorInstance) -> Result<Arc<GeneratorInstance>> {
        if let Some(existing) = self.composed(instance.namespace()) {
            tracing::debug!(namespace = %existing.namespace(), "generator already composed");
            return Ok(existing.clone());
        }
        let instance = Arc::new(instance);
        self.queue.enqueue_instance(&instance)?;
        tracing::info!(
            namespace = %instance.namespace(),
            side_by_side = instance.is_side_by_side(),
            delegated = instance.features().delegates_to_blueprint,
            "composed generator"
        );
        self.instances.push(instance.clone());
        Ok(instance)
    }

    /// Fail unless every instance not yet composed can still be queued.
    fn check_composable<'i>(
        &self,
        instances: impl IntoIterator<Item = &'i GeneratorInstance>,
    ) -> Result<()> {
        for instance in instances {
            if self.composed(instance.namespace()).is_none() {
                self.queue.check(instance)?;
            }
        }
        Ok(())
    }

    pub(crate) fn template_candidates(&self, instance: &GeneratorInstance) -> Vec<TemplateRoot> {
        let mut candidates = self
            .overlays
            .get(instance.namespace())
            .cloned()
            .unwrap_or_default();
        for root in instance.template_candidates() {
            if !candidates.contains(&root) {
                candidates.push(root);
            }
        }
        candidates
    }

    fn resolver<'s>(services: &'s Services, control: &Control) -> BlueprintResolver<'s> {
        BlueprintResolver::new(&services.host, &services.catalog)
            .skip_checks(control.options().skip_checks)
    }

    fn record_applied(&mut self, records: impl IntoIterator<Item = BlueprintRecord>) {
        for record in records {
            if !self.applied.iter().any(|r| r.name == record.name) {
                self.applied.push(record);
            }
        }
    }

    fn add_overlays(&mut self, namespace: &Namespace, roots: Vec<TemplateRoot>) {
        if roots.is_empty() {
            return;
        }
        let overlay = self.overlays.entry(namespace.clone()).or_default();
        for root in roots {
            if !overlay.contains(&root) {
                overlay.push(root);
            }
        }
    }

    /// Instantiate the built-in `sub_command` generator, resolve its
    /// blueprints and compose them all. Returns the base instance.
    ///
    /// Nothing is composed unless every instance can be; a sub-command
    /// composed before returns its existing instance.
    pub(crate) fn compose_generator(
        &mut self,
        services: &Services,
        control: &Control,
        sub_command: &str,
    ) -> Result<Arc<GeneratorInstance>> {
        let namespace = Namespace::from_parts(services.host.namespace_prefix(), sub_command);
        if let Some(existing) = self.composed(&namespace) {
            return Ok(existing.clone());
        }
        let definition = services
            .generators
            .get(sub_command)
            .ok_or_else(|| GeneratorError::UnknownGenerator(sub_command.to_string()))?;
        let base = GeneratorInstance::instantiate(namespace, definition.as_ref(), None)?;

        let resolution =
            Self::resolver(services, control).resolve(&base, &control.blueprint_names(), sub_command)?;
        let diagnostics = resolution.diagnostics.clone();
        let records: Vec<BlueprintRecord> =
            resolution.blueprints.iter().map(|b| b.descriptor.record()).collect();
        let blueprints = resolution.into_instances();
        self.check_composable(&blueprints)?;

        let negotiation = negotiate(&base, &blueprints);
        let base = if negotiation.delegate {
            base.into_delegated()
        } else {
            base
        };
        self.check_composable(std::iter::once(&base))?;

        self.diagnostics.extend(diagnostics);
        self.diagnostics.extend(negotiation.diagnostics);
        self.record_applied(records);
        self.add_overlays(base.namespace(), negotiation.overlay_roots);

        let base = self.compose(base)?;
        for blueprint in blueprints {
            self.compose(blueprint)?;
        }
        Ok(base)
    }

    /// Resolve and compose blueprints of an instance that is already
    /// composed. A delegate blueprint withdraws the base's pending tasks.
    ///
    /// Blueprints that cannot be queued fail the call before the base is
    /// touched.
    pub(crate) fn compose_blueprints(
        &mut self,
        services: &Services,
        control: &Control,
        base: &Arc<GeneratorInstance>,
        sub_command: &str,
    ) -> Result<Vec<Arc<GeneratorInstance>>> {
        let resolution =
            Self::resolver(services, control).resolve(base, &control.blueprint_names(), sub_command)?;
        let diagnostics = resolution.diagnostics.clone();
        let records: Vec<BlueprintRecord> =
            resolution.blueprints.iter().map(|b| b.descriptor.record()).collect();
        let blueprints = resolution.into_instances();
        self.check_composable(&blueprints)?;

        let negotiation = negotiate(base, &blueprints);
        self.diagnostics.extend(diagnostics);
        self.diagnostics.extend(negotiation.diagnostics);
        if negotiation.delegate {
            let withdrawn = self.queue.withdraw(base.namespace());
            tracing::info!(
                namespace = %base.namespace(),
                withdrawn,
                "generator delegated to blueprint"
            );
            let delegated = Arc::new(base.as_ref().clone().into_delegated());
            if let Some(slot) = self
                .instances
                .iter_mut()
                .find(|i| i.namespace() == base.namespace())
            {
                *slot = delegated;
            }
        }
        self.add_overlays(base.namespace(), negotiation.overlay_roots);
        self.record_applied(records);

        blueprints
            .into_iter()
            .map(|blueprint| self.compose(blueprint))
            .collect()
    }
}

/// Drives composition and execution of one run
pub struct Scheduler {
    composition: Composition,
    services: Arc<Services>,
}

impl Scheduler {
    pub fn new(services: Arc<Services>) -> Self {
        Self {
            composition: Composition::default(),
            services,
        }
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Compose an instance before the run starts.
    pub fn compose(&mut self, instance: GeneratorInstance) -> Result<Arc<GeneratorInstance>> {
        self.composition.compose(instance)
    }

    /// Compose the root generator for `sub_command` with its blueprints.
    pub fn compose_root(
        &mut self,
        sub_command: &str,
        state: &SharedRunState,
    ) -> Result<Arc<GeneratorInstance>> {
        self.composition
            .compose_generator(&self.services, &state.control, sub_command)
    }

    /// Drain every phase in registry order.
    ///
    /// Stops at the first failing task; work already committed stays.
    pub async fn run(&mut self, state: &mut SharedRunState, fs: &mut MemFs) -> Result<RunReport> {
        let registry = PhaseRegistry::global();
        let mut files_written = 0;

        for (index, spec) in registry.ordered().iter().enumerate() {
            self.composition.queue.begin(index);
            tracing::debug!(phase = %spec.phase, "entering phase");

            if spec.internal {
                files_written += self.pre_commit(state, fs).await?;
                continue;
            }

            while let Some(entry) = self.composition.queue.next(index) {
                self.execute(spec, entry, state, fs).await?;
            }
        }

        let composition = std::mem::take(&mut self.composition);
        Ok(RunReport {
            executed: composition.executed,
            applied_blueprints: composition.applied,
            diagnostics: composition.diagnostics,
            files_written,
        })
    }

    async fn execute(
        &mut self,
        spec: &PhaseSpec,
        entry: QueueEntry,
        state: &mut SharedRunState,
        fs: &mut MemFs,
    ) -> Result<()> {
        let QueueEntry { instance, task } = entry;
        tracing::debug!(
            phase = %spec.phase,
            namespace = %instance.namespace(),
            task = task.name(),
            "running task"
        );

        let result = match task.body() {
            TaskBody::Once(run) => {
                let ctx = TaskContext::new(
                    *spec,
                    instance.clone(),
                    task.name(),
                    state,
                    fs,
                    &mut self.composition,
                    &self.services,
                );
                run(ctx).await
            }
            TaskBody::EachEntity(run) => {
                let candidates = self.composition.template_candidates(&instance);
                let mut slots: Vec<(Vec<StagedWrite>, Vec<Diagnostic>)> =
                    (0..state.entities.len()).map(|_| Default::default()).collect();
                let SharedRunState {
                    control,
                    application,
                    entities,
                    ..
                } = &mut *state;
                let control: &Control = control;
                let application: &Application = application;
                let services: &Services = &self.services;

                let invocations = entities.iter_mut().zip(slots.iter_mut()).map(
                    |(entity, (staged, notices))| {
                        run(EntityContext {
                            phase: spec.phase,
                            namespace: instance.namespace(),
                            entity,
                            application,
                            control,
                            staged,
                            notices,
                            candidates: &candidates,
                            services,
                        })
                    },
                );

                let outcome = if spec.concurrent_entities {
                    try_join_all(invocations).await.map(|_| ())
                } else {
                    let mut outcome = Ok(());
                    for invocation in invocations {
                        if let Err(e) = invocation.await {
                            outcome = Err(e);
                            break;
                        }
                    }
                    outcome
                };

                if outcome.is_ok() {
                    for (staged, notices) in slots {
                        fs.apply(staged);
                        for notice in notices {
                            self.composition.report(notice);
                        }
                    }
                }
                outcome
            }
        };

        result.map_err(|e| GeneratorError::task_failed(spec.phase, instance.namespace(), task.name(), e))?;
        self.composition.executed.push(ExecutedTask {
            phase: spec.phase,
            namespace: instance.namespace().clone(),
            task: task.name().to_string(),
        });
        Ok(())
    }

    /// Record the run in the config store, then commit the file store.
    async fn pre_commit(&mut self, state: &mut SharedRunState, fs: &mut MemFs) -> Result<usize> {
        let config = state.control.config_mut();
        config.record_blueprints(&self.composition.applied);
        config.set_generator_version(self.services.host.version().to_string());
        let file_name = config.file_name().to_path_buf();
        fs.write_destination(file_name, config.to_json()?);

        let written = fs.commit().await?;
        tracing::info!(files = written, "run committed");
        Ok(written)
    }
}
