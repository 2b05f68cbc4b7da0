//! Task declaration and per-phase task groups
//!
//! A generator declares what it runs by registering named tasks into phases.
//! The registry is plain data: "does this generator implement `writing`" is a
//! lookup, and the scheduler reads the groups back in declaration order.

use crate::error::{GeneratorError, Result};
use crate::phase::{Phase, PhaseRegistry, SubStore};
use crate::scheduler::{EntityContext, TaskContext};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Future returned by every task body
pub type TaskFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// Task invoked once per run
pub type RunFn = Arc<dyn for<'a> Fn(TaskContext<'a>) -> TaskFuture<'a> + Send + Sync>;

/// Task invoked once per known entity
pub type EachEntityFn = Arc<dyn for<'a> Fn(EntityContext<'a>) -> TaskFuture<'a> + Send + Sync>;

#[derive(Clone)]
pub enum TaskBody {
    Once(RunFn),
    EachEntity(EachEntityFn),
}

/// A named unit of work contributed to one phase
#[derive(Clone)]
pub struct Task {
    name: String,
    body: TaskBody,
    identity: bool,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(TaskContext<'a>) -> TaskFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: TaskBody::Once(Arc::new(f)),
            identity: false,
        }
    }

    /// A task fanned out over every entity in the run state
    pub fn each_entity<F>(name: impl Into<String>, f: F) -> Self
    where
        F: for<'a> Fn(EntityContext<'a>) -> TaskFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: TaskBody::EachEntity(Arc::new(f)),
            identity: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    /// Identity setup survives delegation to a blueprint
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_each_entity(&self) -> bool {
        matches!(self.body, TaskBody::EachEntity(_))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("each_entity", &self.is_each_entity())
            .field("identity", &self.identity)
            .finish()
    }
}

/// Tasks of one generator, grouped by phase in declaration order
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    groups: Vec<(Phase, Vec<Task>)>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one task. A task with the same name in the same phase is
    /// replaced in place, keeping its original position.
    pub fn register(&mut self, phase: Phase, task: Task) -> Result<()> {
        let spec = PhaseRegistry::global().spec(phase);
        if spec.internal {
            return Err(GeneratorError::ReservedPhase(phase));
        }
        if task.is_each_entity() && !spec.args.entities {
            return Err(GeneratorError::ShapeViolation {
                phase,
                store: SubStore::Entities,
            });
        }

        let group = match self.groups.iter_mut().position(|(p, _)| *p == phase) {
            Some(index) => &mut self.groups[index].1,
            None => {
                self.groups.push((phase, Vec::new()));
                let last = self.groups.len() - 1;
                &mut self.groups[last].1
            }
        };

        match group.iter_mut().find(|existing| existing.name == task.name) {
            Some(existing) => *existing = task,
            None => group.push(task),
        }
        Ok(())
    }

    /// Register a group of tasks for one phase.
    pub fn register_phase_tasks(
        &mut self,
        phase: Phase,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Result<()> {
        for task in tasks {
            self.register(phase, task)?;
        }
        Ok(())
    }

    /// Register an `initializing` task that keeps running when a blueprint
    /// takes over the generator.
    pub fn register_identity(&mut self, mut task: Task) -> Result<()> {
        task.identity = true;
        self.register(Phase::Initializing, task)
    }

    /// Tasks declared for `phase`, in declaration order. Empty when the
    /// generator contributes nothing to it.
    pub fn collect(&self, phase: Phase) -> &[Task] {
        self.groups
            .iter()
            .find(|(p, _)| *p == phase)
            .map(|(_, tasks)| tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn implements(&self, phase: Phase) -> bool {
        !self.collect(phase).is_empty()
    }

    /// Whether `phase` holds anything that would be dropped on delegation
    pub fn implements_delegable(&self, phase: Phase) -> bool {
        self.collect(phase).iter().any(|task| !task.identity)
    }

    /// Phases with at least one task
    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.groups
            .iter()
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(phase, _)| *phase)
    }

    /// Copy keeping only identity tasks
    pub fn identity_only(&self) -> Self {
        Self {
            groups: self
                .groups
                .iter()
                .map(|(phase, tasks)| {
                    let kept = tasks.iter().filter(|t| t.identity).cloned().collect();
                    (*phase, kept)
                })
                .collect(),
        }
    }
}
