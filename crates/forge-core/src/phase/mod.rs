//! Lifecycle phases
//!
//! A phase is a named stage of a run. Every generator contributes tasks keyed
//! by phase, and the scheduler drains phases in the order fixed by the
//! [`PhaseRegistry`].

pub mod registry;

pub use registry::{define_phases, ArgShape, PhaseGraphError, PhaseRegistry, PhaseSpec, Queueing};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Initializing,
    Prompting,
    Configuring,
    Composing,
    Loading,
    Preparing,
    Default,
    Writing,
    PostWriting,
    /// Internal: records the run in the config store and commits files
    PreCommit,
    Install,
    PostInstall,
    End,
}

impl Phase {
    pub const ALL: [Phase; 13] = [
        Phase::Initializing,
        Phase::Prompting,
        Phase::Configuring,
        Phase::Composing,
        Phase::Loading,
        Phase::Preparing,
        Phase::Default,
        Phase::Writing,
        Phase::PostWriting,
        Phase::PreCommit,
        Phase::Install,
        Phase::PostInstall,
        Phase::End,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Initializing => "initializing",
            Phase::Prompting => "prompting",
            Phase::Configuring => "configuring",
            Phase::Composing => "composing",
            Phase::Loading => "loading",
            Phase::Preparing => "preparing",
            Phase::Default => "default",
            Phase::Writing => "writing",
            Phase::PostWriting => "postWriting",
            Phase::PreCommit => "preCommit",
            Phase::Install => "install",
            Phase::PostInstall => "postInstall",
            Phase::End => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .iter()
            .copied()
            .find(|phase| phase.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown phase: {}", s))
    }
}

/// Partition of the shared run state a task may be handed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubStore {
    Control,
    Source,
    Application,
    Entities,
}

impl fmt::Display for SubStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubStore::Control => "control",
            SubStore::Source => "source",
            SubStore::Application => "application",
            SubStore::Entities => "entities",
        };
        f.write_str(name)
    }
}
