//! Static phase ordering
//!
//! Phases come in two kinds. Edit-style phases form the backbone order.
//! Queued phases name a `before` target and are spliced immediately ahead of
//! it, so `composing`/`loading`/`preparing` land between `configuring` and
//! `default`. The resulting total order is computed once and never changes.

use super::{Phase, SubStore};
use std::sync::OnceLock;
use thiserror::Error;

/// Sub-stores a phase passes to its tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgShape {
    pub control: bool,
    pub source: bool,
    pub application: bool,
    pub entities: bool,
}

impl ArgShape {
    pub const NONE: ArgShape = ArgShape {
        control: false,
        source: false,
        application: false,
        entities: false,
    };
    pub const CONTROL: ArgShape = ArgShape {
        control: true,
        ..ArgShape::NONE
    };
    pub const APPLICATION: ArgShape = ArgShape {
        control: true,
        application: true,
        ..ArgShape::NONE
    };
    pub const ENTITIES: ArgShape = ArgShape {
        control: true,
        application: true,
        entities: true,
        ..ArgShape::NONE
    };
    pub const SOURCE: ArgShape = ArgShape {
        control: true,
        source: true,
        application: true,
        entities: true,
    };

    pub fn allows(&self, store: SubStore) -> bool {
        match store {
            SubStore::Control => self.control,
            SubStore::Source => self.source,
            SubStore::Application => self.application,
            SubStore::Entities => self.entities,
        }
    }
}

/// How a phase is placed in the total order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queueing {
    /// Part of the backbone order
    Edit,
    /// Spliced immediately ahead of `before`
    Queued { before: Phase },
}

/// Static description of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub queueing: Queueing,
    pub args: ArgShape,
    /// Per-entity tasks of this phase may run concurrently
    pub concurrent_entities: bool,
    /// Run by the scheduler itself; generators cannot register tasks here
    pub internal: bool,
}

impl PhaseSpec {
    const fn edit(phase: Phase, args: ArgShape) -> Self {
        Self {
            phase,
            queueing: Queueing::Edit,
            args,
            concurrent_entities: false,
            internal: false,
        }
    }

    const fn queued(phase: Phase, before: Phase, args: ArgShape) -> Self {
        Self {
            phase,
            queueing: Queueing::Queued { before },
            args,
            concurrent_entities: false,
            internal: false,
        }
    }
}

const PHASE_DECLARATIONS: [PhaseSpec; 13] = [
    PhaseSpec::edit(Phase::Initializing, ArgShape::CONTROL),
    PhaseSpec::edit(Phase::Prompting, ArgShape::CONTROL),
    PhaseSpec::edit(Phase::Configuring, ArgShape::CONTROL),
    PhaseSpec::queued(Phase::Composing, Phase::Loading, ArgShape::CONTROL),
    PhaseSpec::queued(Phase::Loading, Phase::Preparing, ArgShape::ENTITIES),
    PhaseSpec::queued(Phase::Preparing, Phase::Default, ArgShape::SOURCE),
    PhaseSpec::edit(Phase::Default, ArgShape::ENTITIES),
    PhaseSpec {
        concurrent_entities: true,
        ..PhaseSpec::edit(Phase::Writing, ArgShape::ENTITIES)
    },
    PhaseSpec::queued(Phase::PostWriting, Phase::PreCommit, ArgShape::SOURCE),
    PhaseSpec {
        internal: true,
        ..PhaseSpec::queued(Phase::PreCommit, Phase::Install, ArgShape::NONE)
    },
    PhaseSpec::edit(Phase::Install, ArgShape::APPLICATION),
    PhaseSpec::queued(Phase::PostInstall, Phase::End, ArgShape::APPLICATION),
    PhaseSpec::edit(Phase::End, ArgShape::APPLICATION),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseGraphError {
    #[error("Phase `{0}` is declared more than once")]
    Duplicate(Phase),
    #[error("Phase `{phase}` is queued before undeclared phase `{before}`")]
    UnknownTarget { phase: Phase, before: Phase },
    #[error("Phase `{0}` is part of a cycle of `before` pointers")]
    Cycle(Phase),
}

/// Ordered, immutable phase table
#[derive(Debug, Clone)]
pub struct PhaseRegistry {
    ordered: Vec<PhaseSpec>,
}

impl PhaseRegistry {
    /// Compute the total order from declarations.
    pub fn build(declarations: &[PhaseSpec]) -> Result<Self, PhaseGraphError> {
        for (index, spec) in declarations.iter().enumerate() {
            if declarations[..index].iter().any(|d| d.phase == spec.phase) {
                return Err(PhaseGraphError::Duplicate(spec.phase));
            }
        }

        let mut order: Vec<&PhaseSpec> = declarations
            .iter()
            .filter(|spec| spec.queueing == Queueing::Edit)
            .collect();
        let mut pending: Vec<&PhaseSpec> = declarations
            .iter()
            .filter(|spec| spec.queueing != Queueing::Edit)
            .collect();

        while !pending.is_empty() {
            let before_pass = pending.len();
            pending.retain(|spec| {
                let Queueing::Queued { before } = spec.queueing else {
                    return false;
                };
                match order.iter().position(|placed| placed.phase == before) {
                    Some(index) => {
                        order.insert(index, *spec);
                        false
                    }
                    None => true,
                }
            });

            if pending.len() == before_pass {
                let stuck = pending[0];
                let Queueing::Queued { before } = stuck.queueing else {
                    unreachable!("only queued phases are pending");
                };
                if declarations.iter().any(|d| d.phase == before) {
                    return Err(PhaseGraphError::Cycle(stuck.phase));
                }
                return Err(PhaseGraphError::UnknownTarget {
                    phase: stuck.phase,
                    before,
                });
            }
        }

        Ok(Self {
            ordered: order.into_iter().copied().collect(),
        })
    }

    /// Process-wide registry of the built-in phases.
    ///
    /// Panics on first access if the built-in declarations are malformed.
    pub fn global() -> &'static PhaseRegistry {
        static REGISTRY: OnceLock<PhaseRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| match PhaseRegistry::build(&PHASE_DECLARATIONS) {
            Ok(registry) => registry,
            Err(e) => panic!("built-in phase graph is malformed: {}", e),
        })
    }

    pub fn ordered(&self) -> &[PhaseSpec] {
        &self.ordered
    }

    pub fn position(&self, phase: Phase) -> usize {
        self.ordered
            .iter()
            .position(|spec| spec.phase == phase)
            .unwrap_or_else(|| unreachable!("every phase is registered"))
    }

    pub fn spec(&self, phase: Phase) -> &PhaseSpec {
        &self.ordered[self.position(phase)]
    }

    pub fn precedes(&self, a: Phase, b: Phase) -> bool {
        self.position(a) < self.position(b)
    }
}

/// The ordered list of built-in phases.
pub fn define_phases() -> &'static [PhaseSpec] {
    PhaseRegistry::global().ordered()
}
