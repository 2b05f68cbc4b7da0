//! Non-fatal conditions reported during composition and runs
//!
//! Soft failures never abort a run. Each one is logged when it is raised and
//! kept in the run report so callers can show the degraded behavior.

use crate::generator::Namespace;
use crate::phase::Phase;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Blueprint package or its sub-command module could not be found
    BlueprintNotFound {
        blueprint: String,
        sub_command: String,
        reason: String,
    },
    /// A delegating blueprint does not implement a phase its base implements
    MissingPhaseImplementation { blueprint: Namespace, phase: Phase },
    /// Version range not satisfied, but checks were disabled
    VersionCheckSkipped {
        blueprint: String,
        range: String,
        host_version: String,
    },
    /// Declared range is not a semver range (git url, workspace protocol...)
    UnparsableVersionRange { blueprint: String, range: String },
    /// Blueprint manifest does not declare the host package at all
    NoHostDependency { blueprint: String },
    /// A template read a legacy data key
    DeprecatedTemplateKey {
        legacy: &'static str,
        modern: &'static str,
    },
}

impl Diagnostic {
    /// Whether the operator should see this without debug logging
    pub fn is_warning(&self) -> bool {
        !matches!(
            self,
            Diagnostic::BlueprintNotFound { .. } | Diagnostic::NoHostDependency { .. }
        )
    }

    /// Log through tracing at the matching level.
    pub fn emit(&self) {
        if self.is_warning() {
            tracing::warn!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::BlueprintNotFound {
                blueprint,
                sub_command,
                reason,
            } => write!(
                f,
                "Blueprint {} not used for `{}`: {}",
                blueprint, sub_command, reason
            ),
            Diagnostic::MissingPhaseImplementation { blueprint, phase } => write!(
                f,
                "Blueprint {} does not implement phase `{}`; the phase contributes nothing for it",
                blueprint, phase
            ),
            Diagnostic::VersionCheckSkipped {
                blueprint,
                range,
                host_version,
            } => write!(
                f,
                "Blueprint {} requires {} but host is {}; continuing because checks are disabled",
                blueprint, range, host_version
            ),
            Diagnostic::UnparsableVersionRange { blueprint, range } => write!(
                f,
                "Blueprint {} declares a non-semver range `{}`; version check skipped",
                blueprint, range
            ),
            Diagnostic::NoHostDependency { blueprint } => write!(
                f,
                "Blueprint {} does not declare a compatible host version",
                blueprint
            ),
            Diagnostic::DeprecatedTemplateKey { legacy, modern } => write!(
                f,
                "Template data key `{}` is deprecated, use `{}`",
                legacy, modern
            ),
        }
    }
}
