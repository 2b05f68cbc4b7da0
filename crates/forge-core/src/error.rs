//! Error types surfaced by composition and runs

use crate::generator::Namespace;
use crate::phase::{Phase, SubStore};
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error carried as the cause of a failed task
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("You cannot use {name} as a blueprint of itself")]
    BlueprintDisallowed { name: String },

    #[error(
        "Blueprint {blueprint} requires {host_package} {range}, but you are running version {host_version}.\n\
         Upgrade with `{upgrade_command}`, change the blueprint, or disable version checks with --skip-checks"
    )]
    BlueprintVersionMismatch {
        blueprint: String,
        host_package: String,
        range: String,
        host_version: String,
        upgrade_command: String,
    },

    #[error("Cannot compose {namespace} into phase `{phase}`: the run is already at `{current}`")]
    LateComposition {
        namespace: Namespace,
        phase: Phase,
        current: Phase,
    },

    #[error("Task `{task}` of {namespace} failed during phase `{phase}`: {source}")]
    TaskExecution {
        phase: Phase,
        namespace: Namespace,
        task: String,
        #[source]
        source: BoxError,
    },

    #[error("Cannot edit {}: file does not exist", path.display())]
    EditTargetNotFound { path: PathBuf },

    #[error("No generator registered for sub-command `{0}`")]
    UnknownGenerator(String),

    #[error("Phase `{phase}` does not pass `{store}` to its tasks")]
    ShapeViolation { phase: Phase, store: SubStore },

    #[error("Phase `{0}` is internal and does not accept generator tasks")]
    ReservedPhase(Phase),

    #[error("Failed to load manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Run state for {0} is already checked out by another run")]
    StateInUse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    /// Wrap a task failure with the phase and module that was executing.
    pub fn task_failed(
        phase: Phase,
        namespace: &Namespace,
        task: impl Into<String>,
        error: anyhow::Error,
    ) -> Self {
        let source: BoxError = match error.downcast::<GeneratorError>() {
            Ok(inner) => Box::new(inner),
            Err(other) => other.into(),
        };
        Self::TaskExecution {
            phase,
            namespace: namespace.clone(),
            task: task.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// The generator error a failed task raised, if its cause was one.
    pub fn task_cause(&self) -> Option<&GeneratorError> {
        match self {
            Self::TaskExecution { source, .. } => source.downcast_ref::<GeneratorError>(),
            _ => None,
        }
    }

    /// Phase and namespace of the task that failed, for reporting.
    pub fn failed_at(&self) -> Option<(Phase, &Namespace)> {
        match self {
            Self::TaskExecution {
                phase, namespace, ..
            } => Some((*phase, namespace)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_keeps_generator_cause() {
        let ns = Namespace::new("forge:app");
        let cause = GeneratorError::UnknownGenerator("server".to_string());
        let err = GeneratorError::task_failed(Phase::Composing, &ns, "composeServer", cause.into());

        assert!(matches!(
            err.task_cause(),
            Some(GeneratorError::UnknownGenerator(name)) if name == "server"
        ));
        let (phase, namespace) = err.failed_at().unwrap();
        assert_eq!(phase, Phase::Composing);
        assert_eq!(namespace.as_str(), "forge:app");
    }

    #[test]
    fn test_task_failure_message_names_phase_and_module() {
        let ns = Namespace::new("forge-foo:app");
        let err = GeneratorError::task_failed(
            Phase::Writing,
            &ns,
            "writeFiles",
            anyhow::anyhow!("disk full"),
        );
        let message = err.to_string();
        assert!(message.contains("writeFiles"));
        assert!(message.contains("forge-foo:app"));
        assert!(message.contains("writing"));
        assert!(message.contains("disk full"));
        assert!(err.task_cause().is_none());
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = GeneratorError::BlueprintVersionMismatch {
            blueprint: "generator-forge-foo".to_string(),
            host_package: "generator-forge".to_string(),
            range: "1.1.1".to_string(),
            host_version: "9.9.9".to_string(),
            upgrade_command: "cargo install forge-cli --force".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("1.1.1"));
        assert!(message.contains("9.9.9"));
    }
}
