//! Shared run state
//!
//! One [`SharedRunState`] exists per output destination. Every generator
//! composed for that destination reads and writes the same four sub-stores:
//! `control`, `source`, `application` and `entities`. The state is keyed by a
//! blake3 hash of the canonical destination path and checked out of the
//! [`StateRegistry`] for the length of one run.

pub mod application;
pub mod config_store;
pub mod control;
pub mod source;

pub use application::{Application, Entities, Entity};
pub use config_store::{BlueprintRecord, ConfigStore};
pub use control::{Control, RunOptions};
pub use source::{Source, SourceHelper};

use crate::error::{GeneratorError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stable key of an output destination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey(String);

impl RunKey {
    /// Hash of the canonical destination path. A destination that does not
    /// exist yet is made absolute against the current directory instead.
    pub fn for_destination(destination: &Path) -> Self {
        let canonical = destination.canonicalize().unwrap_or_else(|_| {
            if destination.is_absolute() {
                destination.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(destination))
                    .unwrap_or_else(|_| PathBuf::from(destination))
            }
        });
        let hash = blake3::hash(canonical.to_string_lossy().as_bytes());
        Self(hash.to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0[..12])
    }
}

/// Mutable state shared by every generator of one destination
#[derive(Debug)]
pub struct SharedRunState {
    key: RunKey,
    pub(crate) control: Control,
    pub(crate) source: Source,
    pub(crate) application: Application,
    pub(crate) entities: Entities,
}

impl SharedRunState {
    pub fn new(key: RunKey, control: Control) -> Self {
        Self {
            key,
            control,
            source: Source::new(),
            application: Application::default(),
            entities: Entities::default(),
        }
    }

    /// Fresh state for `options`, seeded from the config store at the destination.
    pub fn load(options: RunOptions, config_file_name: &str) -> Result<Self> {
        let key = RunKey::for_destination(&options.destination);
        let config = ConfigStore::load(&options.destination, config_file_name)?;
        Ok(Self::new(key, Control::new(options, config)))
    }

    /// Prepare a reused state for another run: reload the config store
    /// from disk and clear `source`, `application` and `entities`.
    pub(crate) fn begin_run(&mut self, options: RunOptions, config_file_name: &str) -> Result<()> {
        let config = ConfigStore::load(&options.destination, config_file_name)?;
        self.control.begin_run(options, config);
        self.source = Source::new();
        self.application = Application::default();
        self.entities = Entities::default();
        Ok(())
    }

    pub fn key(&self) -> &RunKey {
        &self.key
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut Control {
        &mut self.control
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.application
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut Entities {
        &mut self.entities
    }
}

enum Slot {
    Available(Box<SharedRunState>),
    CheckedOut,
}

/// Run states by destination; a state is owned by at most one run at a time
#[derive(Default)]
pub struct StateRegistry {
    states: Mutex<HashMap<RunKey, Slot>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the state for `key`, creating it with `init` on first use.
    pub fn checkout<F>(&self, key: &RunKey, init: F) -> Result<SharedRunState>
    where
        F: FnOnce() -> Result<SharedRunState>,
    {
        let mut states = self
            .states
            .lock()
            .map_err(|_| GeneratorError::StateInUse(key.to_string()))?;
        match states.insert(key.clone(), Slot::CheckedOut) {
            Some(Slot::Available(state)) => Ok(*state),
            Some(Slot::CheckedOut) => Err(GeneratorError::StateInUse(key.to_string())),
            None => match init() {
                Ok(state) => Ok(state),
                Err(e) => {
                    states.remove(key);
                    Err(e)
                }
            },
        }
    }

    /// Return a state so later runs for the same destination reuse it.
    pub fn checkin(&self, state: SharedRunState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(state.key.clone(), Slot::Available(Box::new(state)));
        }
    }

    pub fn is_checked_out(&self, key: &RunKey) -> bool {
        self.states
            .lock()
            .map(|states| matches!(states.get(key), Some(Slot::CheckedOut)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_is_stable_across_spellings() {
        let dir = tempfile::tempdir().unwrap();
        let direct = RunKey::for_destination(dir.path());
        let dotted = RunKey::for_destination(&dir.path().join("."));
        assert_eq!(direct, dotted);
        assert_eq!(direct.as_str().len(), 64);
        assert_ne!(direct, RunKey::for_destination(&dir.path().join("other")));
    }

    #[test]
    fn test_checkout_is_exclusive_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let registry = StateRegistry::new();
        let options = RunOptions::new(dir.path());
        let key = RunKey::for_destination(dir.path());

        let mut state = registry
            .checkout(&key, || SharedRunState::load(options.clone(), ".forge-config.json"))
            .unwrap();
        assert!(registry.is_checked_out(&key));
        assert!(matches!(
            registry.checkout(&key, || unreachable!()),
            Err(GeneratorError::StateInUse(_))
        ));

        state.control_mut().set("marker", json!(1));
        registry.checkin(state);

        let state = registry.checkout(&key, || unreachable!()).unwrap();
        assert_eq!(state.control().get("marker"), Some(&json!(1)));
    }

    #[test]
    fn test_failed_init_releases_slot() {
        let registry = StateRegistry::new();
        let key = RunKey::for_destination(Path::new("/nonexistent/forge"));
        assert!(registry
            .checkout(&key, || Err(GeneratorError::Template("boom".into())))
            .is_err());
        assert!(!registry.is_checked_out(&key));
    }
}
