//! The run queue: one bucket of pending tasks per phase

use crate::error::{GeneratorError, Result};
use crate::generator::{GeneratorInstance, Namespace, Task};
use crate::phase::PhaseRegistry;
use std::collections::VecDeque;
use std::sync::Arc;

/// A task waiting to run, with the instance that contributed it
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub instance: Arc<GeneratorInstance>,
    pub task: Task,
}

/// Phase-bucketed pending tasks
///
/// Buckets follow the registry's total order. The cursor is the bucket being
/// drained; buckets before it are finished and accept nothing new.
#[derive(Debug)]
pub struct RunQueue {
    buckets: Vec<VecDeque<QueueEntry>>,
    cursor: Option<usize>,
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RunQueue {
    pub fn new() -> Self {
        let phases = PhaseRegistry::global().ordered().len();
        Self {
            buckets: (0..phases).map(|_| VecDeque::new()).collect(),
            cursor: None,
        }
    }

    /// Fail if `instance` has tasks for a phase that already finished.
    pub fn check(&self, instance: &GeneratorInstance) -> Result<()> {
        let Some(cursor) = self.cursor else {
            return Ok(());
        };
        let registry = PhaseRegistry::global();
        match instance
            .tasks()
            .phases()
            .find(|&phase| registry.position(phase) < cursor)
        {
            Some(late) => Err(GeneratorError::LateComposition {
                namespace: instance.namespace().clone(),
                phase: late,
                current: registry.ordered()[cursor].phase,
            }),
            None => Ok(()),
        }
    }

    /// Append every task of `instance` to its phase bucket.
    ///
    /// Fails without enqueuing anything if the instance has tasks for a
    /// phase that already finished.
    pub fn enqueue_instance(&mut self, instance: &Arc<GeneratorInstance>) -> Result<()> {
        self.check(instance)?;
        for (index, spec) in PhaseRegistry::global().ordered().iter().enumerate() {
            for task in instance.collect(spec.phase) {
                self.buckets[index].push_back(QueueEntry {
                    instance: instance.clone(),
                    task: task.clone(),
                });
            }
        }
        Ok(())
    }

    /// Mark bucket `index` as the one being drained.
    pub fn begin(&mut self, index: usize) {
        self.cursor = Some(index);
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Next pending task of bucket `index`
    pub fn next(&mut self, index: usize) -> Option<QueueEntry> {
        self.buckets.get_mut(index)?.pop_front()
    }

    /// Drop pending non-identity tasks of `namespace`. Returns how many were dropped.
    pub fn withdraw(&mut self, namespace: &Namespace) -> usize {
        let mut dropped = 0;
        for bucket in &mut self.buckets {
            let before = bucket.len();
            bucket.retain(|entry| {
                entry.instance.namespace() != namespace || entry.task.is_identity()
            });
            dropped += before - bucket.len();
        }
        dropped
    }

    /// Pending tasks across all buckets
    pub fn pending(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }
}
